//! Onboarding gate for the student area
//!
//! Students must finish their profile before reaching any gated route.
//! Instructors and admins are never gated.

use aula_common::config::ServerConfig;
use aula_common::db::User;
use aula_common::Result;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::students;
use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::AppState;

/// True when the user still has to complete onboarding
pub async fn onboarding_required(db: &SqlitePool, user: &User) -> Result<bool> {
    if user.role().is_staff() {
        return Ok(false);
    }
    Ok(!students::is_profile_completed(db, &user.id).await?)
}

/// Onboarding form while the profile is unfinished, dashboard otherwise
pub fn landing_for(server: &ServerConfig, onboarding_required: bool) -> &str {
    if onboarding_required {
        &server.onboarding_path
    } else {
        &server.dashboard_path
    }
}

/// Where a freshly signed-in user should land
pub async fn landing_path(state: &AppState, user: &User) -> Result<String> {
    let required = onboarding_required(&state.db, user).await?;
    Ok(landing_for(&state.config.server, required).to_string())
}

/// Middleware: 401 without a session, 303 to onboarding for unfinished
/// student profiles, otherwise pass through
pub async fn onboarding_gate(
    State(state): State<AppState>,
    current: CurrentUser,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if onboarding_required(&state.db, &current.user).await? {
        debug!(
            user_id = %current.user.id,
            path = %request.uri().path(),
            "Onboarding incomplete, redirecting"
        );
        return Ok(Redirect::to(&state.config.server.onboarding_path).into_response());
    }

    Ok(next.run(request).await)
}
