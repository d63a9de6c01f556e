pub mod calendar;
pub mod profile;
pub mod streak;
pub mod workout;
