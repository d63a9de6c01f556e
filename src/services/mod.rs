pub mod calendar;
pub mod changes;
pub mod dates;
pub mod guard;
pub mod refresher;
pub mod service;
pub mod streak;

pub use service::StreakService;
