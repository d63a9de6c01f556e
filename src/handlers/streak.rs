use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::models::streak::{StreakOutcome, StreakSummary};
use crate::AppState;

pub async fn get_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakSummary>> {
    let summary = state.streaks.summary(auth_user.id, Utc::now()).await?;
    Ok(Json(summary))
}

/// Runs the rollover now instead of waiting for the background refresher.
/// Answers 409 while another recomputation for the same user is running.
pub async fn refresh_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<StreakOutcome>> {
    let outcome = state.streaks.refresh(auth_user.id, Utc::now()).await?;
    Ok(Json(outcome))
}
