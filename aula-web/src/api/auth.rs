//! Email/password registration, login, logout and session lookup

use aula_common::credentials::{hash_password, verify_password};
use aula_common::db::{Role, User};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::{info, warn};

use crate::db::users::{self, NewUser};
use crate::error::{ApiError, ApiResult};
use crate::onboarding::{landing_for, onboarding_required};
use crate::session::{end_session, start_session, CurrentUser};
use crate::AppState;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned whenever a session is started
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    /// Bearer token for non-browser clients (also set as cookie)
    pub token: String,
    pub onboarding_required: bool,
    /// Where the client should go next
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: User,
    pub onboarding_required: bool,
}

pub(crate) async fn session_response(
    state: &AppState,
    user: User,
    token: String,
) -> ApiResult<SessionResponse> {
    let onboarding_required = onboarding_required(&state.db, &user).await?;
    let redirect = landing_for(&state.config.server, onboarding_required).to_string();

    Ok(SessionResponse {
        user,
        token,
        onboarding_required,
        redirect,
    })
}

/// Normalize and sanity-check an email address
pub(crate) fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };

    if !valid {
        return Err(ApiError::BadRequest("A valid email address is required".to_string()));
    }
    Ok(email)
}

/// Display name fallback: the local part of the email
pub(crate) fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_name(&email));

    let password_hash = hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;
    let created = users::create_user(
        &mut tx,
        &NewUser {
            email: &email,
            name: &name,
            image: None,
            password_hash: Some(&password_hash),
            role: Role::Student,
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => {
            return Err(ApiError::Conflict("Email is already registered".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    info!(user_id = %user.id, "Registered new user");

    let token = start_session(&state, &cookies, &user.id).await?;
    let response = session_response(&state, user, token).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
///
/// Unknown email, OAuth-only account and wrong password share one message.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = users::find_by_email(&state.db, &req.email.trim().to_lowercase()).await?;

    let user = match user {
        Some(user)
            if user
                .password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(&req.password, hash)) =>
        {
            user
        }
        _ => {
            warn!("Failed login attempt");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let token = start_session(&state, &cookies, &user.id).await?;
    info!(user_id = %user.id, "User signed in");

    Ok(Json(session_response(&state, user, token).await?))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
) -> ApiResult<StatusCode> {
    end_session(&state, &headers, &cookies).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/session
pub async fn current_session(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<SessionInfo>> {
    let onboarding_required = onboarding_required(&state.db, &current.user).await?;
    Ok(Json(SessionInfo {
        user: current.user,
        onboarding_required,
    }))
}

/// Build credential auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(current_session))
}
