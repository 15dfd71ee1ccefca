//! Certificates: the caller's list and public verification

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::certificates::{self, CertificateVerification, CertificateWithCourse};
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::AppState;

/// GET /api/certificates
pub async fn list_certificates(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<CertificateWithCourse>>> {
    Ok(Json(
        certificates::list_for_student(&state.db, &current.user.id).await?,
    ))
}

/// GET /api/certificates/verify/:code (no auth)
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<CertificateVerification>> {
    certificates::verify_code(&state.db, &code)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Certificate {}", code)))
}

/// Student-area certificate routes
pub fn certificate_routes() -> Router<AppState> {
    Router::new().route("/api/certificates", get(list_certificates))
}

/// Public verification route
pub fn certificate_verify_routes() -> Router<AppState> {
    Router::new().route("/api/certificates/verify/:code", get(verify_certificate))
}
