//! Session handling
//!
//! A session token travels in the session cookie or in an
//! `Authorization: Bearer` header. Only its SHA-256 digest is stored.

use aula_common::config::SessionConfig;
use aula_common::credentials::{generate_token, hash_token};
use aula_common::db::{unix_now, User};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::debug;

use crate::db::sessions;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Cookie carrying the staged OAuth registration token
pub const PENDING_COOKIE: &str = "aula_pending";

/// Signed-in user; rejects with 401
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by the onboarding gate
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }

        let cookies = parts.extensions.get::<Cookies>();
        let token = request_token(&parts.headers, cookies, &state.config.session.cookie_name)
            .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;

        let user = sessions::find_session_user(&state.db, &hash_token(&token))
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".to_string()))?;

        let current = CurrentUser { user };
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Signed-in user if any; never rejects for a missing session
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(current) => Ok(OptionalUser(Some(current.user))),
            Err(ApiError::Unauthorized(_)) => Ok(OptionalUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Session token from the Bearer header, falling back to the cookie
pub fn request_token(
    headers: &HeaderMap,
    cookies: Option<&Cookies>,
    cookie_name: &str,
) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        cookies
            .and_then(|c| c.get(cookie_name))
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Create a session for the user and set the session cookie
///
/// Returns the raw token so API clients can use it as a Bearer token.
pub async fn start_session(state: &AppState, cookies: &Cookies, user_id: &str) -> ApiResult<String> {
    let config = &state.config.session;
    let token = generate_token();
    let expires_at = unix_now() + config.ttl_hours.max(1) * 3600;

    sessions::insert_session(&state.db, &hash_token(&token), user_id, expires_at).await?;
    let purged = sessions::purge_expired_sessions(&state.db, user_id).await?;
    if purged > 0 {
        debug!(user_id, purged, "Purged expired sessions");
    }

    cookies.add(session_cookie(config, token.clone()));
    Ok(token)
}

/// Delete the request's session (if any) and expire the cookie
pub async fn end_session(state: &AppState, headers: &HeaderMap, cookies: &Cookies) -> ApiResult<()> {
    let cookie_name = &state.config.session.cookie_name;
    if let Some(token) = request_token(headers, Some(cookies), cookie_name) {
        sessions::delete_session(&state.db, &hash_token(&token)).await?;
    }

    cookies.remove(removal_cookie(cookie_name.clone()));
    Ok(())
}

pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .max_age(time::Duration::hours(config.ttl_hours.max(1)))
        .build()
}

/// Short-lived cookie naming a staged registration
pub fn pending_cookie(config: &SessionConfig, token: String, ttl_minutes: i64) -> Cookie<'static> {
    Cookie::build((PENDING_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .max_age(time::Duration::minutes(ttl_minutes.max(1)))
        .build()
}

/// Cookie value that makes the browser drop `name`
pub fn removal_cookie(name: impl Into<String>) -> Cookie<'static> {
    Cookie::build((name.into(), "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            request_token(&headers, None, "aula_session"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_token(&headers, None, "aula_session"), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(request_token(&headers, None, "aula_session"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let config = SessionConfig::default();
        let cookie = session_cookie(&config, "tok".to_string());
        assert_eq!(cookie.name(), config.cookie_name);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::hours(config.ttl_hours))
        );
    }
}
