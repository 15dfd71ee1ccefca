//! Evaluations: listing, authoring and AI-graded submissions

use aula_common::db::{Achievement, Evaluation, EvaluationResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{managed_course, required_text};
use crate::db::evaluations::{self, NewEvaluation, NewResult, ResultWithEvaluation};
use crate::db::{courses, enrollments, notifications};
use crate::error::{ApiError, ApiResult};
use crate::services::awards::{self, award_achievement};
use crate::services::EvaluationRequest;
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub result: EvaluationResult,
    pub max_score: f64,
    pub passing_score: f64,
    pub achievements: Vec<Achievement>,
}

/// GET /api/courses/:id/evaluations
///
/// Enrolled students and staff only.
pub async fn list_evaluations(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Vec<Evaluation>>> {
    if courses::find_course(&state.db, &course_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Course {}", course_id)));
    }

    if !current.user.role().is_staff()
        && enrollments::find_enrollment(&state.db, &current.user.id, &course_id)
            .await?
            .is_none()
    {
        return Err(ApiError::Forbidden("Not enrolled in this course".to_string()));
    }

    let rows = evaluations::list_for_course(&state.db, &course_id).await?;
    Ok(Json(rows))
}

/// POST /api/courses/:id/evaluations
pub async fn create_evaluation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(course_id): Path<String>,
    Json(mut new): Json<NewEvaluation>,
) -> ApiResult<(StatusCode, Json<Evaluation>)> {
    let course = managed_course(&state.db, &current.user, &course_id).await?;

    new.title = required_text(&new.title, "title")?;
    new.instructions = required_text(&new.instructions, "instructions")?;
    if new.max_score.is_nan() || new.max_score <= 0.0 {
        return Err(ApiError::BadRequest("max_score must be positive".to_string()));
    }
    if !(0.0..=new.max_score).contains(&new.passing_score) {
        return Err(ApiError::BadRequest(
            "passing_score must be between 0 and max_score".to_string(),
        ));
    }
    if let Some(module_id) = &new.module_id {
        let module = courses::find_module(&state.db, module_id).await?;
        if module.map(|m| m.course_id) != Some(course.id.clone()) {
            return Err(ApiError::BadRequest(
                "module_id does not belong to this course".to_string(),
            ));
        }
    }

    let evaluation = evaluations::insert_evaluation(&state.db, &course.id, &new).await?;
    info!(evaluation_id = %evaluation.id, course_id = %course.id, "Evaluation created");

    Ok((StatusCode::CREATED, Json(evaluation)))
}

/// POST /api/evaluations/:id/submit
///
/// The evaluator is called before anything is written, so a failed call
/// leaves no partial result behind.
pub async fn submit_evaluation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(evaluation_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionResponse>)> {
    let evaluation = evaluations::find_evaluation(&state.db, &evaluation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Evaluation {}", evaluation_id)))?;

    let answer = required_text(&req.answer, "answer")?;

    if enrollments::find_enrollment(&state.db, &current.user.id, &evaluation.course_id)
        .await?
        .is_none()
    {
        return Err(ApiError::Forbidden("Not enrolled in this course".to_string()));
    }
    if !state.evaluator.is_configured() {
        return Err(ApiError::ServiceUnavailable(
            "AI evaluator is not configured".to_string(),
        ));
    }

    let verdict = state
        .evaluator
        .evaluate(&EvaluationRequest {
            evaluation_id: evaluation.id.clone(),
            title: evaluation.title.clone(),
            instructions: evaluation.instructions.clone(),
            max_score: evaluation.max_score,
            answer: answer.clone(),
        })
        .await?;

    let score = verdict.clamped_score(evaluation.max_score);
    let passed = score >= evaluation.passing_score;
    let feedback = verdict
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());

    let mut tx = state.db.begin().await?;
    let result = evaluations::insert_result(
        &mut *tx,
        &NewResult {
            evaluation_id: &evaluation.id,
            student_id: &current.user.id,
            answer: &answer,
            score,
            feedback,
            passed,
        },
    )
    .await?;

    notifications::insert_notification(
        &mut *tx,
        &current.user.id,
        notifications::KIND_EVALUATION,
        if passed { "Evaluation passed" } else { "Evaluation graded" },
        &format!("{}: {} / {}", evaluation.title, score, evaluation.max_score),
    )
    .await?;

    let mut earned = Vec::new();
    if score >= evaluation.max_score {
        earned.extend(award_achievement(&mut tx, &current.user.id, awards::PERFECT_SCORE).await?);
    }
    tx.commit().await?;

    info!(
        user_id = %current.user.id,
        evaluation_id = %evaluation.id,
        score,
        passed,
        "Evaluation submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            result,
            max_score: evaluation.max_score,
            passing_score: evaluation.passing_score,
            achievements: earned,
        }),
    ))
}

/// GET /api/results
pub async fn list_results(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<ResultWithEvaluation>>> {
    let rows = evaluations::list_results_for_student(&state.db, &current.user.id).await?;
    Ok(Json(rows))
}

/// Build evaluation routes
pub fn evaluation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/courses/:id/evaluations",
            get(list_evaluations).post(create_evaluation),
        )
        .route("/api/evaluations/:id/submit", post(submit_evaluation))
        .route("/api/results", get(list_results))
}
