//! Course catalogue and authoring

use aula_common::db::{Course, Enrollment, Lesson, Module};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{managed_course, require_staff, required_text, visible_course};
use crate::db::courses::{
    self, CourseFilter, CourseSummary, CourseUpdate, NewCourse, NewLesson,
};
use crate::db::enrollments;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};
use crate::session::{CurrentUser, OptionalUser};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CourseListParams {
    #[serde(default = "default_page")]
    pub page: i64,
    pub category: Option<String>,
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub courses: Vec<CourseSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleWithLessons>,
    pub total_lessons: usize,
    /// Caller's enrollment, when signed in and enrolled
    pub enrollment: Option<Enrollment>,
}

#[derive(Debug, Deserialize)]
pub struct NewModuleRequest {
    pub title: String,
}

/// Nest lessons under their modules, preserving both orders
pub fn group_lessons(modules: Vec<Module>, lessons: Vec<Lesson>) -> Vec<ModuleWithLessons> {
    let mut grouped: Vec<ModuleWithLessons> = modules
        .into_iter()
        .map(|module| ModuleWithLessons {
            module,
            lessons: Vec::new(),
        })
        .collect();

    for lesson in lessons {
        if let Some(entry) = grouped.iter_mut().find(|m| m.module.id == lesson.module_id) {
            entry.lessons.push(lesson);
        }
    }
    grouped
}

/// GET /api/courses?page&category&search
pub async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseListParams>,
) -> ApiResult<Json<CourseListResponse>> {
    let filter = CourseFilter {
        category: params.category,
        search: params.search,
    };

    let total = courses::count_published(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, params.page);
    let courses = courses::list_published(&state.db, &filter, PAGE_SIZE, pagination.offset).await?;

    Ok(Json(CourseListResponse {
        courses,
        pagination,
    }))
}

/// GET /api/courses/:id
pub async fn get_course(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<CourseDetail>> {
    let course = visible_course(&state.db, user.as_ref(), &course_id).await?;

    let modules = courses::list_modules(&state.db, &course.id).await?;
    let lessons = courses::list_course_lessons(&state.db, &course.id).await?;
    let total_lessons = lessons.len();

    let enrollment = match &user {
        Some(user) => enrollments::find_enrollment(&state.db, &user.id, &course.id).await?,
        None => None,
    };

    Ok(Json(CourseDetail {
        course,
        modules: group_lessons(modules, lessons),
        total_lessons,
        enrollment,
    }))
}

/// POST /api/courses
pub async fn create_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(mut new): Json<NewCourse>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    require_staff(&current.user)?;
    new.title = required_text(&new.title, "title")?;

    let course = courses::insert_course(&state.db, &current.user.id, &new).await?;
    info!(course_id = %course.id, instructor_id = %current.user.id, "Course created");

    Ok((StatusCode::CREATED, Json(course)))
}

/// PUT /api/courses/:id
pub async fn update_course(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
    Json(update): Json<CourseUpdate>,
) -> ApiResult<Json<Course>> {
    managed_course(&state.db, &current.user, &course_id).await?;
    if let Some(title) = &update.title {
        required_text(title, "title")?;
    }

    let course = courses::update_course(&state.db, &course_id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Course {}", course_id)))?;

    Ok(Json(course))
}

/// POST /api/courses/:id/modules
pub async fn create_module(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
    Json(req): Json<NewModuleRequest>,
) -> ApiResult<(StatusCode, Json<Module>)> {
    let course = managed_course(&state.db, &current.user, &course_id).await?;
    let title = required_text(&req.title, "title")?;

    let module = courses::insert_module(&state.db, &course.id, &title).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// POST /api/modules/:id/lessons
pub async fn create_lesson(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(module_id): Path<String>,
    Json(mut new): Json<NewLesson>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    require_staff(&current.user)?;
    let module = courses::find_module(&state.db, &module_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Module {}", module_id)))?;
    managed_course(&state.db, &current.user, &module.course_id).await?;
    new.title = required_text(&new.title, "title")?;

    let lesson = courses::insert_lesson(&state.db, &module.id, &new).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// Build catalogue and authoring routes
pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/:id", get(get_course).put(update_course))
        .route("/api/courses/:id/modules", post(create_module))
        .route("/api/modules/:id/lessons", post(create_lesson))
}
