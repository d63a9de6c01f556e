use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::calendar::{CalendarMarking, CalendarQuery};
use crate::AppState;

pub async fn get_calendar(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarMarking>> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::Validation("from must not be after to".into()));
        }
    }

    let marking = state
        .streaks
        .calendar(
            auth_user.id,
            query.from,
            query.to,
            Utc::now(),
            &state.config.palette,
        )
        .await?;

    Ok(Json(marking))
}
