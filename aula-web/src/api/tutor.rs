//! AI tutor chat (student area)

use aula_common::db::TutorMessage;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::required_text;
use crate::db::{courses, students, tutor};
use crate::error::{ApiError, ApiResult};
use crate::services::{ChatTurn, TutorContext, TutorRequest};
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub course_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub course_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub course_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub course_id: Option<String>,
    pub messages: Vec<TutorMessage>,
}

/// POST /api/tutor/chat
///
/// Both turns are stored only once the tutor has answered.
pub async fn chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let message = required_text(&req.message, "message")?;
    if !state.tutor.is_configured() {
        return Err(ApiError::ServiceUnavailable(
            "AI tutor is not configured".to_string(),
        ));
    }

    let course_id = req.course_id.filter(|c| !c.trim().is_empty());
    let course_title = match &course_id {
        Some(id) => Some(
            courses::find_course(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Course {}", id)))?
                .title,
        ),
        None => None,
    };

    let student_name = students::find_student(&state.db, &current.user.id)
        .await?
        .and_then(|s| s.full_name)
        .unwrap_or_else(|| current.user.name.clone());

    let history: Vec<ChatTurn> = tutor::recent_messages(
        &state.db,
        &current.user.id,
        course_id.as_deref(),
        i64::from(state.tutor.history_limit()),
    )
    .await?
    .into_iter()
    .map(|m| ChatTurn {
        role: m.role,
        content: m.content,
    })
    .collect();

    let reply = state
        .tutor
        .chat(&TutorRequest {
            message: message.clone(),
            history,
            context: TutorContext {
                student_name: Some(student_name),
                course_title,
            },
        })
        .await?
        .reply;

    let mut tx = state.db.begin().await?;
    tutor::insert_message(
        &mut *tx,
        &current.user.id,
        course_id.as_deref(),
        tutor::ROLE_USER,
        &message,
    )
    .await?;
    tutor::insert_message(
        &mut *tx,
        &current.user.id,
        course_id.as_deref(),
        tutor::ROLE_ASSISTANT,
        &reply,
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %current.user.id, course_id = ?course_id, "Tutor answered");

    Ok(Json(ChatResponse { reply, course_id }))
}

/// GET /api/tutor/history?course_id
pub async fn history(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    let course_id = params.course_id.filter(|c| !c.trim().is_empty());
    let messages = tutor::list_messages(&state.db, &current.user.id, course_id.as_deref()).await?;

    Ok(Json(HistoryResponse {
        course_id,
        messages,
    }))
}

/// Build tutor routes
pub fn tutor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tutor/chat", post(chat))
        .route("/api/tutor/history", get(history))
}
