//! Lesson completion and course progress (student area)

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::{courses, enrollments, progress};
use crate::error::{ApiError, ApiResult};
use crate::services::progress::{record_lesson_completion, LessonCompletion};
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CourseProgress {
    pub course_id: String,
    pub enrollment_id: String,
    pub status: String,
    pub progress_percent: f64,
    pub completed_lesson_ids: Vec<String>,
    pub total_lessons: i64,
}

fn not_enrolled() -> ApiError {
    ApiError::Forbidden("Not enrolled in this course".to_string())
}

/// POST /api/lessons/:id/complete
pub async fn complete_lesson(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(lesson_id): Path<String>,
) -> ApiResult<Json<LessonCompletion>> {
    let course_id = courses::find_lesson_course_id(&state.db, &lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lesson {}", lesson_id)))?;

    let enrollment = enrollments::find_enrollment(&state.db, &current.user.id, &course_id)
        .await?
        .ok_or_else(not_enrolled)?;

    let mut tx = state.db.begin().await?;
    let completion = record_lesson_completion(&mut tx, &enrollment, &lesson_id).await?;
    tx.commit().await?;

    Ok(Json(completion))
}

/// GET /api/courses/:id/progress
pub async fn course_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<CourseProgress>> {
    if courses::find_course(&state.db, &course_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Course {}", course_id)));
    }

    let enrollment = enrollments::find_enrollment(&state.db, &current.user.id, &course_id)
        .await?
        .ok_or_else(not_enrolled)?;

    let completed_lesson_ids = progress::completed_lesson_ids(&state.db, &enrollment.id).await?;
    let total_lessons = courses::count_course_lessons(&state.db, &course_id).await?;

    Ok(Json(CourseProgress {
        course_id,
        enrollment_id: enrollment.id,
        status: enrollment.status,
        progress_percent: enrollment.progress_percent,
        completed_lesson_ids,
        total_lessons,
    }))
}

/// Build progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lessons/:id/complete", post(complete_lesson))
        .route("/api/courses/:id/progress", get(course_progress))
}
