use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::store::LogWindow;
use crate::error::{AppError, AppResult};
use crate::models::workout::{CreateWorkoutRequest, NewWorkoutLog, WorkoutLogEntry, WorkoutQuery};
use crate::services::changes::ChangeKind;
use crate::services::dates::{end_of_day, local_date, parse_instant};
use crate::AppState;

pub async fn create_workout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateWorkoutRequest>,
) -> AppResult<Json<WorkoutLogEntry>> {
    body.validate()?;

    let now = Utc::now();
    let completed_at = match body.completed_at.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => now,
    };

    let profile = state.store.fetch_profile(auth_user.id).await?;
    let tz = profile.timezone()?;

    if completed_at > end_of_day(now, &tz)? {
        return Err(AppError::Validation(
            "completed_at cannot be later than today".into(),
        ));
    }

    // One entry per local day; the store rejects a second one with a conflict
    let log = state
        .store
        .insert_workout_log(NewWorkoutLog {
            user_id: auth_user.id,
            completed_at,
            local_date: local_date(completed_at, &tz),
            is_rest_day: body.is_rest_day,
            note: body.note,
        })
        .await?;

    tracing::info!(
        user_id = %auth_user.id,
        log_id = %log.id,
        date = %log.local_date,
        rest_day = log.is_rest_day,
        "Workout logged"
    );
    state.changes.publish(auth_user.id, ChangeKind::WorkoutLogged);

    Ok(Json(log))
}

pub async fn list_workouts(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<WorkoutQuery>,
) -> AppResult<Json<Vec<WorkoutLogEntry>>> {
    let profile = state.store.fetch_profile(auth_user.id).await?;
    let today = local_date(Utc::now(), &profile.timezone()?);

    let start = query.from.unwrap_or_else(|| today - Duration::days(30));
    let end = query.to.unwrap_or(today);
    if start > end {
        return Err(AppError::Validation("from must not be after to".into()));
    }

    let logs = state
        .store
        .fetch_workout_logs(auth_user.id, LogWindow::Between(start, end))
        .await?;

    Ok(Json(logs))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    // Idempotent: deleting an unknown or already-deleted entry still succeeds
    let deleted = state.store.delete_workout_log(auth_user.id, log_id).await?;

    if let Some(log) = deleted {
        tracing::info!(user_id = %auth_user.id, log_id = %log.id, "Workout deleted");
        state.changes.publish(auth_user.id, ChangeKind::WorkoutDeleted);
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
