//! Integration tests for the AI tutor and evaluator calls
//!
//! Both services are mockito servers; nothing is stored unless the
//! service answered successfully.

mod helpers;

use aula_common::db::Role;
use aula_common::config::TomlConfig;
use axum::http::StatusCode;
use helpers::*;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

fn ai_config(server: &ServerGuard) -> TomlConfig {
    let mut config = test_config();
    config.tutor.url = Some(format!("{}/tutor", server.url()));
    config.tutor.api_key = Some("tutor-key".to_string());
    config.evaluator.url = Some(format!("{}/evaluate", server.url()));
    config
}

async fn count(app: &TestApp, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&app.db)
        .await
        .unwrap()
}

// =============================================================================
// Tutor Tests
// =============================================================================

#[tokio::test]
async fn test_tutor_chat_stores_and_forwards_history() {
    let mut server = Server::new_async().await;
    let app = setup_app_with(ai_config(&server)).await;
    let token = register_onboarded(&app, "ana@example.com").await;

    let first = server
        .mock("POST", "/tutor")
        .match_header("authorization", "Bearer tutor-key")
        .match_body(Matcher::PartialJson(json!({
            "message": "What is a cell?",
            "history": [],
            "context": {"student_name": "Test Student"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply": "The basic unit of life."}"#)
        .create_async()
        .await;

    let body = app
        .send_json(
            test_request(
                "POST",
                "/api/tutor/chat",
                Some(&token),
                Some(json!({"message": "  What is a cell?  "})),
            ),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["reply"], "The basic unit of life.");
    assert!(body["course_id"].is_null());
    first.assert_async().await;
    drop(first);

    // The stored exchange travels with the next message
    let second = server
        .mock("POST", "/tutor")
        .match_body(Matcher::PartialJson(json!({
            "message": "And a tissue?",
            "history": [
                {"role": "user", "content": "What is a cell?"},
                {"role": "assistant", "content": "The basic unit of life."}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "A group of cells."}"#)
        .create_async()
        .await;

    let body = app
        .send_json(
            test_request(
                "POST",
                "/api/tutor/chat",
                Some(&token),
                Some(json!({"message": "And a tissue?"})),
            ),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["reply"], "A group of cells.");
    second.assert_async().await;

    let history = app
        .send_json(test_request("GET", "/api/tutor/history", Some(&token), None), StatusCode::OK)
        .await;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[3]["content"], "A group of cells.");
}

#[tokio::test]
async fn test_tutor_history_is_scoped_by_course() {
    let mut server = Server::new_async().await;
    let _tutor = server
        .mock("POST", "/tutor")
        .match_body(Matcher::PartialJson(json!({"context": {"course_title": "Cells"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply": "Sure."}"#)
        .create_async()
        .await;
    let app = setup_app_with(ai_config(&server)).await;
    let (_, staff) = create_user_with_session(&app, "instructor@example.com", Role::Instructor).await;
    let course = seed_course(&app, &staff, "Cells", true, 1).await;
    let token = register_onboarded(&app, "ana@example.com").await;

    let body = app
        .send_json(
            test_request(
                "POST",
                "/api/tutor/chat",
                Some(&token),
                Some(json!({"message": "Help", "course_id": course.id})),
            ),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["course_id"], course.id.as_str());

    let scoped = app
        .send_json(
            test_request(
                "GET",
                &format!("/api/tutor/history?course_id={}", course.id),
                Some(&token),
                None,
            ),
            StatusCode::OK,
        )
        .await;
    assert_eq!(scoped["messages"].as_array().unwrap().len(), 2);

    let general = app
        .send_json(test_request("GET", "/api/tutor/history", Some(&token), None), StatusCode::OK)
        .await;
    assert!(general["messages"].as_array().unwrap().is_empty());

    app.send_json(
        test_request(
            "POST",
            "/api/tutor/chat",
            Some(&token),
            Some(json!({"message": "Help", "course_id": "missing"})),
        ),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn test_tutor_unconfigured_and_failures() {
    let app = setup_app().await;
    let token = register_onboarded(&app, "ana@example.com").await;

    app.send_json(
        test_request("POST", "/api/tutor/chat", Some(&token), Some(json!({"message": "Hi"}))),
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .await;

    let mut server = Server::new_async().await;
    let _tutor = server
        .mock("POST", "/tutor")
        .with_status(500)
        .with_body("model crashed")
        .create_async()
        .await;
    let app = setup_app_with(ai_config(&server)).await;
    let token = register_onboarded(&app, "ana@example.com").await;

    app.send_json(
        test_request("POST", "/api/tutor/chat", Some(&token), Some(json!({"message": "   "}))),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let body = app
        .send_json(
            test_request("POST", "/api/tutor/chat", Some(&token), Some(json!({"message": "Hi"}))),
            StatusCode::BAD_GATEWAY,
        )
        .await;
    assert_eq!(body["error"]["code"], "BAD_GATEWAY");
    assert_eq!(body["error"]["message"], "AI tutor request failed");
    assert_eq!(count(&app, "tutor_messages").await, 0);
}

// =============================================================================
// Evaluator Tests
// =============================================================================

/// Published course with one lesson and one evaluation; returns
/// (course, evaluation id)
async fn course_with_evaluation(app: &TestApp) -> (SeededCourse, String) {
    let (_, staff) = create_user_with_session(app, "instructor@example.com", Role::Instructor).await;
    let course = seed_course(app, &staff, "Genetics", true, 1).await;

    let evaluation = app
        .send_json(
            test_request(
                "POST",
                &format!("/api/courses/{}/evaluations", course.id),
                Some(&staff),
                Some(json!({
                    "title": "Essay",
                    "instructions": "Explain dominant alleles",
                    "max_score": 10.0,
                    "passing_score": 6.0
                })),
            ),
            StatusCode::CREATED,
        )
        .await;
    let id = evaluation["id"].as_str().unwrap().to_string();
    (course, id)
}

#[tokio::test]
async fn test_submission_is_graded_and_clamped() {
    let mut server = Server::new_async().await;
    let evaluator = server
        .mock("POST", "/evaluate")
        .match_body(Matcher::PartialJson(json!({
            "title": "Essay",
            "max_score": 10.0,
            "answer": "One copy is enough"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"score": 14.5, "feedback": "  Excellent  "}"#)
        .create_async()
        .await;
    let app = setup_app_with(ai_config(&server)).await;
    let (course, evaluation_id) = course_with_evaluation(&app).await;
    let token = register_onboarded(&app, "ana@example.com").await;
    let submit_uri = format!("/api/evaluations/{}/submit", evaluation_id);

    // Not enrolled
    app.send_json(
        test_request("POST", &submit_uri, Some(&token), Some(json!({"answer": "One copy is enough"}))),
        StatusCode::FORBIDDEN,
    )
    .await;

    app.send_json(
        test_request("POST", &format!("/api/courses/{}/enroll", course.id), Some(&token), None),
        StatusCode::CREATED,
    )
    .await;

    let listed = app
        .send_json(
            test_request("GET", &format!("/api/courses/{}/evaluations", course.id), Some(&token), None),
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed[0]["id"], evaluation_id.as_str());

    app.send_json(
        test_request("POST", &submit_uri, Some(&token), Some(json!({"answer": " "}))),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let graded = app
        .send_json(
            test_request("POST", &submit_uri, Some(&token), Some(json!({"answer": "One copy is enough"}))),
            StatusCode::CREATED,
        )
        .await;
    evaluator.assert_async().await;

    assert_eq!(graded["result"]["score"], 10.0);
    assert_eq!(graded["result"]["passed"], true);
    assert_eq!(graded["result"]["feedback"], "Excellent");
    assert_eq!(graded["max_score"], 10.0);
    assert_eq!(graded["achievements"][0]["code"], "perfect_score");

    let results = app
        .send_json(test_request("GET", "/api/results", Some(&token), None), StatusCode::OK)
        .await;
    assert_eq!(results[0]["evaluation_title"], "Essay");
    assert_eq!(results[0]["course_title"], "Genetics");

    app.send_json(
        test_request("POST", "/api/evaluations/missing/submit", Some(&token), Some(json!({"answer": "x"}))),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn test_failing_score_is_not_passed() {
    let mut server = Server::new_async().await;
    let _evaluator = server
        .mock("POST", "/evaluate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"score": 3}"#)
        .create_async()
        .await;
    let app = setup_app_with(ai_config(&server)).await;
    let (course, evaluation_id) = course_with_evaluation(&app).await;
    let token = register_onboarded(&app, "ana@example.com").await;
    app.send_json(
        test_request("POST", &format!("/api/courses/{}/enroll", course.id), Some(&token), None),
        StatusCode::CREATED,
    )
    .await;

    let graded = app
        .send_json(
            test_request(
                "POST",
                &format!("/api/evaluations/{}/submit", evaluation_id),
                Some(&token),
                Some(json!({"answer": "Not sure"})),
            ),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(graded["result"]["score"], 3.0);
    assert_eq!(graded["result"]["passed"], false);
    assert!(graded["result"]["feedback"].is_null());
    assert!(graded["achievements"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_evaluator_unavailable_stores_nothing() {
    let app = setup_app().await;
    let (course, evaluation_id) = course_with_evaluation(&app).await;
    let token = register_onboarded(&app, "ana@example.com").await;
    app.send_json(
        test_request("POST", &format!("/api/courses/{}/enroll", course.id), Some(&token), None),
        StatusCode::CREATED,
    )
    .await;

    app.send_json(
        test_request(
            "POST",
            &format!("/api/evaluations/{}/submit", evaluation_id),
            Some(&token),
            Some(json!({"answer": "Anything"})),
        ),
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .await;
    assert_eq!(count(&app, "results").await, 0);
}
