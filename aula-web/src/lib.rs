//! aula-web library - Aula learning platform backend
//!
//! Student dashboards, course catalogue, enrollment and progress, AI tutor
//! and evaluator calls, onboarding gate and the OAuth registration bridge.

pub mod api;
pub mod db;
pub mod error;
pub mod onboarding;
pub mod pagination;
pub mod services;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use aula_common::config::TomlConfig;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::services::{ClientError, EvaluatorClient, OAuthClient, TutorClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    pub tutor: TutorClient,
    pub evaluator: EvaluatorClient,
    pub oauth: OAuthClient,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state, building the outbound HTTP clients
    pub fn new(db: SqlitePool, config: TomlConfig) -> Result<Self, ClientError> {
        Ok(Self {
            tutor: TutorClient::new(&config.tutor)?,
            evaluator: EvaluatorClient::new(&config.evaluator)?,
            oauth: OAuthClient::new()?,
            db,
            config: Arc::new(config),
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
///
/// Student-area routes sit behind the onboarding gate; catalogue, auth,
/// profile and certificate verification do not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    // Student area (session required, onboarding completed)
    let gated = Router::new()
        .merge(api::dashboard_routes())
        .merge(api::enrollment_routes())
        .merge(api::progress_routes())
        .merge(api::evaluation_routes())
        .merge(api::tutor_routes())
        .merge(api::achievement_routes())
        .merge(api::certificate_routes())
        .merge(api::notification_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            onboarding::onboarding_gate,
        ));

    // Public routes (handlers authenticate where needed)
    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::oauth_routes())
        .merge(api::profile_routes())
        .merge(api::course_routes())
        .merge(api::certificate_verify_routes());

    let cors = cors_layer(&state.config.server.public_url);

    let router = Router::new()
        .merge(public)
        .merge(gated)
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the configured public origin, with credentials
fn cors_layer(public_url: &str) -> Option<CorsLayer> {
    let origin = public_url.trim_end_matches('/');
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        Err(e) => {
            warn!("Invalid public_url {:?} for CORS, layer disabled: {}", public_url, e);
            None
        }
    }
}
