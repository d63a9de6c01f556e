use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::db::store::StoreError;
use crate::services::dates::DateError;

/// Store call that failed, carried by [`StreakError::Persistence`] so a
/// half-applied update can be told apart from one that never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FetchWorkoutLogs,
    FetchProfile,
    WriteCurrentStreak,
    WriteWeekComplete,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreOp::FetchWorkoutLogs => "fetch workout logs",
            StoreOp::FetchProfile => "fetch profile",
            StoreOp::WriteCurrentStreak => "write current streak",
            StoreOp::WriteWeekComplete => "write week-complete flag",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StreakError {
    #[error(transparent)]
    InvalidDate(#[from] DateError),

    #[error("Invalid weekly goal: {0}")]
    InvalidGoal(i32),

    #[error("Failed to {op}: {source}")]
    Persistence {
        op: StoreOp,
        #[source]
        source: StoreError,
    },

    #[error("Streak update already in progress for user {0}")]
    ConcurrentUpdate(Uuid),
}

impl StreakError {
    pub fn persistence(op: StoreOp) -> impl FnOnce(StoreError) -> Self {
        move |source| StreakError::Persistence { op, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Streak(#[from] StreakError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DateError> for AppError {
    fn from(e: DateError) -> Self {
        AppError::Streak(StreakError::InvalidDate(e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Streak(StreakError::InvalidDate(_) | StreakError::InvalidGoal(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::Streak(StreakError::ConcurrentUpdate(_)) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Streak(StreakError::Persistence { op, source }) => {
                tracing::error!(operation = %op, error = %source, "Streak persistence error");
                store_status(source)
            }
            AppError::Store(e) => store_status(e),
        }
    }
}

fn store_status(e: &StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        StoreError::Database(_) | StoreError::Unavailable(_) => {
            tracing::error!(error = %e, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = json!({
            "error": {
                "message": message,
                "code": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
