use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// One logged day. Rest days occupy the calendar but never count toward the goal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WorkoutLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub completed_at: DateTime<Utc>,
    /// Local day the entry was bucketed into when it was written.
    pub local_date: NaiveDate,
    pub is_rest_day: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutLog {
    pub user_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub local_date: NaiveDate,
    pub is_rest_day: bool,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutRequest {
    /// RFC 3339 timestamp; defaults to now.
    pub completed_at: Option<String>,
    #[serde(default)]
    pub is_rest_day: bool,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkoutQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
