//! Achievement catalogue with the caller's awards

use axum::{extract::State, routing::get, Json, Router};

use crate::db::achievements::{list_with_status, AchievementStatus};
use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::AppState;

/// GET /api/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<AchievementStatus>>> {
    Ok(Json(list_with_status(&state.db, &current.user.id).await?))
}

/// Build achievement routes
pub fn achievement_routes() -> Router<AppState> {
    Router::new().route("/api/achievements", get(list_achievements))
}
