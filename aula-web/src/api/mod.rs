//! HTTP API handlers for aula-web

pub mod achievements;
pub mod auth;
pub mod certificates;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod evaluations;
pub mod health;
pub mod notifications;
pub mod oauth;
pub mod profile;
pub mod progress;
pub mod tutor;

pub use achievements::achievement_routes;
pub use auth::auth_routes;
pub use certificates::{certificate_routes, certificate_verify_routes};
pub use courses::course_routes;
pub use dashboard::dashboard_routes;
pub use enrollments::enrollment_routes;
pub use evaluations::evaluation_routes;
pub use health::health_routes;
pub use notifications::notification_routes;
pub use oauth::oauth_routes;
pub use profile::profile_routes;
pub use progress::progress_routes;
pub use tutor::tutor_routes;

use aula_common::db::{Course, Role, User};
use sqlx::SqlitePool;

use crate::db::courses as course_rows;
use crate::error::{ApiError, ApiResult};

/// Content authoring is reserved to instructors and admins
pub(crate) fn require_staff(user: &User) -> ApiResult<()> {
    if user.role().is_staff() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only instructors and admins can author courses".to_string(),
        ))
    }
}

/// Owner instructor or any admin
pub(crate) fn can_manage(user: &User, course: &Course) -> bool {
    match user.role() {
        Role::Admin => true,
        Role::Instructor => course.instructor_id.as_deref() == Some(user.id.as_str()),
        Role::Student => false,
    }
}

/// Course the caller may see: published, or a draft they manage
pub(crate) async fn visible_course(
    db: &SqlitePool,
    user: Option<&User>,
    course_id: &str,
) -> ApiResult<Course> {
    let course = course_rows::find_course(db, course_id).await?;
    match course {
        Some(course) if course.is_published => Ok(course),
        Some(course) if user.is_some_and(|u| can_manage(u, &course)) => Ok(course),
        _ => Err(ApiError::NotFound(format!("Course {}", course_id))),
    }
}

/// Course the caller may edit; 403 for students and non-owners
pub(crate) async fn managed_course(
    db: &SqlitePool,
    user: &User,
    course_id: &str,
) -> ApiResult<Course> {
    require_staff(user)?;

    let course = course_rows::find_course(db, course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Course {}", course_id)))?;

    if !can_manage(user, &course) {
        return Err(ApiError::Forbidden(
            "Only the course instructor or an admin can edit this course".to_string(),
        ));
    }
    Ok(course)
}

/// Trimmed text, or 400 naming the missing field
pub(crate) fn required_text(value: &str, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
