//! In-app notifications (student area)

use aula_common::db::Notification;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::notifications;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub updated: u64,
}

/// GET /api/notifications?unread_only
pub async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<NotificationParams>,
) -> ApiResult<Json<Vec<Notification>>> {
    let rows =
        notifications::list_for_user(&state.db, &current.user.id, params.unread_only).await?;
    Ok(Json(rows))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !notifications::mark_read(&state.db, &id, &current.user.id).await? {
        return Err(ApiError::NotFound(format!("Notification {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<MarkAllResponse>> {
    let updated = notifications::mark_all_read(&state.db, &current.user.id).await?;
    Ok(Json(MarkAllResponse { updated }))
}

/// Build notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/:id/read", post(mark_read))
}
