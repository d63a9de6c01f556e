pub mod calendar;
pub mod health;
pub mod profile;
pub mod streak;
pub mod workouts;
pub mod ws;
