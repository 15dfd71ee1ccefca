//! Student dashboard

use aula_common::db::{Student, User};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db::dashboard::{stats_for_student, DashboardStats};
use crate::db::enrollments::{self, EnrollmentWithCourse};
use crate::db::students;
use crate::error::ApiResult;
use crate::session::CurrentUser;
use crate::AppState;

/// Enrollments shown on the dashboard
const RECENT_ENROLLMENTS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: User,
    pub student: Option<Student>,
    pub stats: DashboardStats,
    pub recent_enrollments: Vec<EnrollmentWithCourse>,
}

/// GET /api/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<DashboardResponse>> {
    let user_id = current.user.id.as_str();

    let student = students::find_student(&state.db, user_id).await?;
    let stats = stats_for_student(&state.db, user_id).await?;
    let recent_enrollments =
        enrollments::list_for_student(&state.db, user_id, Some(RECENT_ENROLLMENTS)).await?;

    Ok(Json(DashboardResponse {
        user: current.user,
        student,
        stats,
        recent_enrollments,
    }))
}

/// Build dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}
