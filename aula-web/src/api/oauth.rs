//! OAuth sign-in and the registration bridge
//!
//! A provider identity that is neither linked nor matches an existing email
//! is staged server-side as a pending registration. The browser only holds
//! a cookie naming it until the user confirms on the completion page.

use aula_common::config::OAuthProviderConfig;
use aula_common::credentials::{generate_token, hash_token};
use aula_common::db::{unix_now, Role, User};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::{info, warn};

use super::auth::{default_name, session_response, SessionResponse};
use crate::db::accounts::{self, PendingRegistration};
use crate::db::users::{self, NewUser};
use crate::error::{ApiError, ApiResult};
use crate::onboarding::landing_path;
use crate::services::{OAuthClient, ProviderProfile};
use crate::session::{pending_cookie, removal_cookie, start_session, PENDING_COOKIE};
use crate::AppState;

/// Lifetime of an authorization `state` value
pub const OAUTH_STATE_TTL_SECS: i64 = 10 * 60;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRegistrationRequest {
    #[serde(default)]
    pub name: Option<String>,
}

fn provider_config<'a>(state: &'a AppState, name: &str) -> ApiResult<&'a OAuthProviderConfig> {
    state
        .config
        .oauth_provider(name)
        .ok_or_else(|| ApiError::NotFound(format!("OAuth provider {}", name)))
}

fn redirect_uri(state: &AppState, provider: &OAuthProviderConfig) -> String {
    format!(
        "{}/api/auth/oauth/{}/callback",
        state.config.server.public_url.trim_end_matches('/'),
        provider.name
    )
}

/// GET /api/auth/oauth/:provider
pub async fn begin_oauth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let provider = provider_config(&state, &provider)?;

    accounts::purge_expired_oauth_states(&state.db).await?;
    let oauth_state = generate_token();
    accounts::insert_oauth_state(
        &state.db,
        &oauth_state,
        &provider.name,
        unix_now() + OAUTH_STATE_TTL_SECS,
    )
    .await?;

    let url = OAuthClient::authorize_url(provider, &redirect_uri(&state, provider), &oauth_state)?;
    Ok(Redirect::to(&url))
}

/// GET /api/auth/oauth/:provider/callback
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let provider = provider_config(&state, &provider)?;

    if let Some(error) = params.error {
        warn!(provider = %provider.name, %error, "Provider refused sign-in");
        let detail = params.error_description.unwrap_or(error);
        return Err(ApiError::Unauthorized(format!("Sign-in was refused: {}", detail)));
    }

    let oauth_state = params
        .state
        .ok_or_else(|| ApiError::BadRequest("Missing OAuth state".to_string()))?;
    let stored = accounts::take_oauth_state(&state.db, &oauth_state).await?;
    match stored {
        Some((stored_provider, expires_at))
            if expires_at > unix_now() && stored_provider.eq_ignore_ascii_case(&provider.name) => {}
        _ => {
            return Err(ApiError::BadRequest(
                "Unknown or expired OAuth state".to_string(),
            ))
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let token = state
        .oauth
        .exchange_code(provider, &code, &redirect_uri(&state, provider))
        .await?;
    let profile = state.oauth.fetch_profile(provider, &token.access_token).await?;

    // Known identity
    if let Some(user) =
        accounts::find_linked_user(&state.db, &provider.name, &profile.provider_account_id).await?
    {
        return sign_in(&state, &cookies, user).await;
    }

    // Existing account with the same email: link and sign in
    if let Some(user) = users::find_by_email(&state.db, &profile.email).await? {
        accounts::link_account(
            &state.db,
            &provider.name,
            &profile.provider_account_id,
            &user.id,
        )
        .await?;
        if let Some(image) = &profile.image {
            users::set_image_if_missing(&state.db, &user.id, image).await?;
        }
        info!(user_id = %user.id, provider = %provider.name, "Linked provider account by email");
        return sign_in(&state, &cookies, user).await;
    }

    stage_registration(&state, &cookies, provider, profile).await
}

async fn sign_in(state: &AppState, cookies: &Cookies, user: User) -> ApiResult<Redirect> {
    start_session(state, cookies, &user.id).await?;
    let target = landing_path(state, &user).await?;
    info!(user_id = %user.id, "User signed in with provider");
    Ok(Redirect::to(&target))
}

async fn stage_registration(
    state: &AppState,
    cookies: &Cookies,
    provider: &OAuthProviderConfig,
    profile: ProviderProfile,
) -> ApiResult<Redirect> {
    let ttl_minutes = state.config.registration.pending_ttl_minutes.max(1);
    let token = generate_token();

    let pending = PendingRegistration {
        token_hash: hash_token(&token),
        provider: provider.name.clone(),
        provider_account_id: profile.provider_account_id,
        email: profile.email,
        name: profile.name,
        image: profile.image,
        expires_at: unix_now() + ttl_minutes * 60,
    };
    accounts::insert_pending_registration(&state.db, &pending).await?;

    cookies.add(pending_cookie(&state.config.session, token, ttl_minutes));
    info!(provider = %provider.name, "Staged pending registration");

    Ok(Redirect::to(&state.config.server.registration_path))
}

/// Pending registration named by the cookie; 404 if none, 410 if expired
async fn load_pending(state: &AppState, cookies: &Cookies) -> ApiResult<PendingRegistration> {
    let token = cookies
        .get(PENDING_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::NotFound("No pending registration".to_string()))?;

    let pending = accounts::find_pending_registration(&state.db, &hash_token(&token))
        .await?
        .ok_or_else(|| ApiError::NotFound("No pending registration".to_string()))?;

    if pending.is_expired() {
        accounts::delete_pending_registration(&state.db, &pending.token_hash).await?;
        cookies.remove(removal_cookie(PENDING_COOKIE));
        return Err(ApiError::Gone(
            "Pending registration expired, please sign in again".to_string(),
        ));
    }

    Ok(pending)
}

/// GET /api/auth/registration/pending
pub async fn get_pending_registration(
    State(state): State<AppState>,
    cookies: Cookies,
) -> ApiResult<Json<PendingRegistration>> {
    Ok(Json(load_pending(&state, &cookies).await?))
}

/// POST /api/auth/registration/complete
///
/// User, student profile and account link are written in one transaction.
/// An email registered in the meantime is linked instead of duplicated.
pub async fn complete_registration(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<CompleteRegistrationRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let pending = load_pending(&state, &cookies).await?;

    let name = req
        .name
        .as_deref()
        .or(pending.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_name(&pending.email));

    let mut tx = state.db.begin().await?;

    let user = match users::find_by_email(&mut *tx, &pending.email).await? {
        Some(existing) => existing,
        None => {
            users::create_user(
                &mut tx,
                &NewUser {
                    email: &pending.email,
                    name: &name,
                    image: pending.image.as_deref(),
                    password_hash: None,
                    role: Role::Student,
                },
            )
            .await?
        }
    };
    accounts::link_account(
        &mut *tx,
        &pending.provider,
        &pending.provider_account_id,
        &user.id,
    )
    .await?;
    accounts::delete_pending_registration(&mut *tx, &pending.token_hash).await?;

    tx.commit().await?;

    cookies.remove(removal_cookie(PENDING_COOKIE));
    info!(user_id = %user.id, provider = %pending.provider, "Completed provider registration");

    let token = start_session(&state, &cookies, &user.id).await?;
    let response = session_response(&state, user, token).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Build OAuth and registration bridge routes
pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/oauth/:provider", get(begin_oauth))
        .route("/api/auth/oauth/:provider/callback", get(oauth_callback))
        .route("/api/auth/registration/pending", get(get_pending_registration))
        .route("/api/auth/registration/complete", post(complete_registration))
}
