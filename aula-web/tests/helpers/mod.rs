//! Shared helpers for aula-web integration tests

#![allow(dead_code)]

use aula_common::config::TomlConfig;
use aula_common::credentials::{generate_token, hash_token};
use aula_common::db::{init_memory_database, unix_now, Role};
use aula_web::db::{sessions, users};
use aula_web::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

pub struct TestApp {
    pub app: Router,
    pub db: SqlitePool,
}

impl TestApp {
    /// Send a request through a clone of the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Send and decode a JSON answer, asserting the status
    pub async fn send_json(&self, request: Request<Body>, expected: StatusCode) -> Value {
        let response = self.send(request).await;
        let status = response.status();
        let body = extract_json(response.into_body()).await;
        assert_eq!(status, expected, "unexpected status, body: {}", body);
        body
    }
}

/// Configuration without any external service
pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.tutor.timeout_secs = 5;
    config.evaluator.timeout_secs = 5;
    config
}

pub async fn setup_app_with(config: TomlConfig) -> TestApp {
    let db = init_memory_database().await.unwrap();
    let state = AppState::new(db.clone(), config).unwrap();
    TestApp {
        app: build_router(state),
        db,
    }
}

pub async fn setup_app() -> TestApp {
    setup_app_with(test_config()).await
}

/// Test helper: Create request with optional bearer token and JSON body
pub fn test_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Test helper: Extract JSON body from response (Null for empty bodies)
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Value of a cookie set by the response
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| {
            v[prefix.len()..]
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Should have Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Register through the API; returns the session token
pub async fn register(app: &TestApp, email: &str) -> String {
    let body = app
        .send_json(
            test_request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"email": email, "password": "correct-horse", "name": "Test Student"})),
            ),
            StatusCode::CREATED,
        )
        .await;
    body["token"].as_str().unwrap().to_string()
}

/// Register and complete onboarding; returns the session token
pub async fn register_onboarded(app: &TestApp, email: &str) -> String {
    let token = register(app, email).await;
    app.send_json(
        test_request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(json!({"full_name": "Test Student", "education_level": "undergraduate"})),
        ),
        StatusCode::OK,
    )
    .await;
    token
}

/// Insert a user with the given role and a live session; returns (user id, token)
pub async fn create_user_with_session(app: &TestApp, email: &str, role: Role) -> (String, String) {
    let mut conn = app.db.acquire().await.unwrap();
    let user = users::create_user(
        &mut conn,
        &users::NewUser {
            email,
            name: "Staff Member",
            image: None,
            password_hash: None,
            role,
        },
    )
    .await
    .unwrap();

    let token = generate_token();
    sessions::insert_session(&mut *conn, &hash_token(&token), &user.id, unix_now() + 3600)
        .await
        .unwrap();
    (user.id, token)
}

/// Course authored through the API: one module with `lessons` lessons
pub struct SeededCourse {
    pub id: String,
    pub module_id: String,
    pub lesson_ids: Vec<String>,
}

pub async fn seed_course(app: &TestApp, staff_token: &str, title: &str, published: bool, lessons: usize) -> SeededCourse {
    let course = app
        .send_json(
            test_request(
                "POST",
                "/api/courses",
                Some(staff_token),
                Some(json!({"title": title, "category": "science", "is_published": published})),
            ),
            StatusCode::CREATED,
        )
        .await;
    let id = course["id"].as_str().unwrap().to_string();

    let module = app
        .send_json(
            test_request(
                "POST",
                &format!("/api/courses/{}/modules", id),
                Some(staff_token),
                Some(json!({"title": "Module 1"})),
            ),
            StatusCode::CREATED,
        )
        .await;
    let module_id = module["id"].as_str().unwrap().to_string();

    let mut lesson_ids = Vec::new();
    for i in 0..lessons {
        let lesson = app
            .send_json(
                test_request(
                    "POST",
                    &format!("/api/modules/{}/lessons", module_id),
                    Some(staff_token),
                    Some(json!({"title": format!("Lesson {}", i + 1), "duration_minutes": 10})),
                ),
                StatusCode::CREATED,
            )
            .await;
        lesson_ids.push(lesson["id"].as_str().unwrap().to_string());
    }

    SeededCourse {
        id,
        module_id,
        lesson_ids,
    }
}
