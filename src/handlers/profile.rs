use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::profile::{ProfileResponse, ProfileSettings, UpdateProfileRequest};
use crate::services::changes::ChangeKind;
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state.store.fetch_profile(auth_user.id).await?;
    Ok(Json(profile.into()))
}

/// Goal and time zone changes apply going forward; credited weeks are left as they are.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    body.validate()?;

    let settings = ProfileSettings::from(body);
    if settings == ProfileSettings::default() {
        return Err(AppError::Validation("Nothing to update".into()));
    }

    let profile = state.store.update_profile(auth_user.id, settings).await?;

    tracing::info!(
        user_id = %auth_user.id,
        weekly_goal = profile.weekly_goal,
        time_zone = %profile.time_zone,
        "Profile updated"
    );
    state.changes.publish(auth_user.id, ChangeKind::ProfileChanged);

    Ok(Json(profile.into()))
}
