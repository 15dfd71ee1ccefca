//! Student profile and onboarding (reachable before onboarding is done)

use aula_common::db::{Student, User};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::db::students::{self, ProfileUpdate};
use crate::error::{ApiError, ApiResult};
use crate::onboarding::onboarding_required;
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub student: Option<Student>,
    pub onboarding_required: bool,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub student: Student,
    pub redirect: String,
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<ProfileResponse>> {
    let student = students::find_student(&state.db, &current.user.id).await?;
    let onboarding_required = onboarding_required(&state.db, &current.user).await?;

    Ok(Json(ProfileResponse {
        user: current.user,
        student,
        onboarding_required,
    }))
}

/// PUT /api/profile
///
/// Partial update; omitted or blank fields keep their stored value.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Student>> {
    let update = update.normalized();
    let student = students::upsert_profile(&state.db, &current.user.id, &update, false).await?;
    Ok(Json(student))
}

/// POST /api/onboarding
pub async fn complete_onboarding(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<OnboardingResponse>> {
    let update = update.normalized();
    if update.full_name.is_none() || update.education_level.is_none() {
        return Err(ApiError::BadRequest(
            "full_name and education_level are required".to_string(),
        ));
    }

    let student = students::upsert_profile(&state.db, &current.user.id, &update, true).await?;
    info!(user_id = %current.user.id, "Onboarding completed");

    Ok(Json(OnboardingResponse {
        student,
        redirect: state.config.server.dashboard_path.clone(),
    }))
}

/// Build profile and onboarding routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/onboarding", post(complete_onboarding))
}
