use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::profile::{ProfileSettings, ProfileStreakState};
use crate::models::streak::WeekCredit;
use crate::models::workout::{NewWorkoutLog, WorkoutLogEntry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which workout logs a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWindow {
    All,
    /// `completed_at >= instant`
    Since(DateTime<Utc>),
    /// Stored local dates, inclusive on both ends.
    Between(NaiveDate, NaiveDate),
}

/// Persistence for profile streak fields and workout logs.
///
/// Logs come back ordered by `completed_at` ascending. Each write touches one
/// row in one statement, so a failed write leaves the previous value intact.
#[async_trait]
pub trait StreakStore: Send + Sync {
    async fn fetch_workout_logs(
        &self,
        user_id: Uuid,
        window: LogWindow,
    ) -> StoreResult<Vec<WorkoutLogEntry>>;

    /// Creates the profile with the default goal on first access.
    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<ProfileStreakState>;

    /// Writes the streak together with the credit record for the evaluated week.
    async fn write_current_streak(
        &self,
        user_id: Uuid,
        value: i32,
        credit: WeekCredit,
    ) -> StoreResult<()>;

    async fn write_week_complete(&self, user_id: Uuid, value: bool) -> StoreResult<()>;

    /// Fails with [`StoreError::Conflict`] when the user already has an entry on that local date.
    async fn insert_workout_log(&self, log: NewWorkoutLog) -> StoreResult<WorkoutLogEntry>;

    async fn delete_workout_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> StoreResult<Option<WorkoutLogEntry>>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        settings: ProfileSettings,
    ) -> StoreResult<ProfileStreakState>;

    async fn ping(&self) -> StoreResult<()>;
}
