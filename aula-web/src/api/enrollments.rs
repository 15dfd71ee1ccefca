//! Enrollment endpoints (student area)

use aula_common::db::Enrollment;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::visible_course;
use crate::db::enrollments::{self, EnrollmentWithCourse};
use crate::db::notifications;
use crate::error::{ApiError, ApiResult};
use crate::services::awards::{self, award_achievement};
use crate::session::CurrentUser;
use crate::AppState;

/// POST /api/courses/:id/enroll
///
/// 201 when the enrollment is created, 200 with the existing row otherwise.
pub async fn enroll(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Enrollment>)> {
    let course = visible_course(&state.db, Some(&current.user), &course_id).await?;
    if !course.is_published {
        return Err(ApiError::NotFound(format!("Course {}", course_id)));
    }

    let mut tx = state.db.begin().await?;
    let (enrollment, created) = enrollments::enroll(&mut tx, &current.user.id, &course.id).await?;

    if created {
        notifications::insert_notification(
            &mut *tx,
            &current.user.id,
            notifications::KIND_ENROLLMENT,
            "Enrollment confirmed",
            &format!("You are now enrolled in {}", course.title),
        )
        .await?;
        award_achievement(&mut tx, &current.user.id, awards::FIRST_ENROLLMENT).await?;
    }
    tx.commit().await?;

    if created {
        info!(user_id = %current.user.id, course_id = %course.id, "Student enrolled");
        Ok((StatusCode::CREATED, Json(enrollment)))
    } else {
        Ok((StatusCode::OK, Json(enrollment)))
    }
}

/// DELETE /api/courses/:id/enroll
pub async fn unenroll(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<StatusCode> {
    if !enrollments::unenroll(&state.db, &current.user.id, &course_id).await? {
        return Err(ApiError::NotFound("Not enrolled in this course".to_string()));
    }

    info!(user_id = %current.user.id, %course_id, "Student unenrolled");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/enrollments
pub async fn list_enrollments(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<EnrollmentWithCourse>>> {
    let rows = enrollments::list_for_student(&state.db, &current.user.id, None).await?;
    Ok(Json(rows))
}

/// Build enrollment routes
pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/enrollments", get(list_enrollments))
        .route("/api/courses/:id/enroll", post(enroll).delete(unenroll))
}
