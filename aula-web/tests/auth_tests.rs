//! Integration tests for password auth, sessions and the OAuth
//! registration bridge
//!
//! The OAuth provider is a mockito server answering the token and
//! userinfo endpoints.

mod helpers;

use aula_common::config::{OAuthProviderConfig, TomlConfig};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use helpers::*;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

// =============================================================================
// Password Auth Tests
// =============================================================================

#[tokio::test]
async fn test_register_validation_and_conflict() {
    let app = setup_app().await;

    let body = app
        .send_json(
            test_request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"email": " Ana@Example.com ", "password": "correct-horse"})),
            ),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["user"]["name"], "ana");
    assert_eq!(body["onboarding_required"], true);
    assert_eq!(body["redirect"], "/onboarding");
    assert!(body["user"].get("password_hash").is_none());

    app.send_json(
        test_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "ana@example.com", "password": "another-one"})),
        ),
        StatusCode::CONFLICT,
    )
    .await;

    app.send_json(
        test_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "short@example.com", "password": "abc"})),
        ),
        StatusCode::BAD_REQUEST,
    )
    .await;

    app.send_json(
        test_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": "not-an-email", "password": "correct-horse"})),
        ),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn test_login_uses_generic_error() {
    let app = setup_app().await;
    register(&app, "ana@example.com").await;

    let wrong_password = app
        .send_json(
            test_request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "ana@example.com", "password": "wrong-horse"})),
            ),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    let unknown = app
        .send_json(
            test_request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "nobody@example.com", "password": "correct-horse"})),
            ),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    assert_eq!(wrong_password["error"]["message"], unknown["error"]["message"]);

    let ok = app
        .send_json(
            test_request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({"email": "ana@example.com", "password": "correct-horse"})),
            ),
            StatusCode::OK,
        )
        .await;
    assert!(ok["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_session_cookie_and_logout() {
    let app = setup_app().await;
    register(&app, "ana@example.com").await;

    let response = app
        .send(test_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "correct-horse"})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie_value(&response, "aula_session").expect("Should set session cookie");

    // The cookie alone authenticates
    let with_cookie = |method: &str, uri: &str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("aula_session={}", cookie))
            .body(Body::empty())
            .unwrap()
    };

    let session = app
        .send_json(with_cookie("GET", "/api/auth/session"), StatusCode::OK)
        .await;
    assert_eq!(session["user"]["email"], "ana@example.com");
    assert_eq!(session["onboarding_required"], true);

    let response = app.send(with_cookie("POST", "/api/auth/logout")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.send_json(with_cookie("GET", "/api/auth/session"), StatusCode::UNAUTHORIZED)
        .await;
}

#[tokio::test]
async fn test_bearer_logout_invalidates_token() {
    let app = setup_app().await;
    let token = register(&app, "ana@example.com").await;

    let response = app
        .send(test_request("POST", "/api/auth/logout", Some(&token), None))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.send_json(
        test_request("GET", "/api/auth/session", Some(&token), None),
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

// =============================================================================
// OAuth Helpers
// =============================================================================

fn oauth_config(server: &ServerGuard) -> TomlConfig {
    let mut config = test_config();
    config.oauth.providers.push(OAuthProviderConfig {
        name: "campus".to_string(),
        client_id: "aula-client".to_string(),
        client_secret: Some("s3cret".to_string()),
        authorize_url: format!("{}/authorize", server.url()),
        token_url: format!("{}/token", server.url()),
        userinfo_url: format!("{}/userinfo", server.url()),
        scopes: vec!["openid".to_string(), "email".to_string()],
    });
    config
}

async fn mock_provider(server: &mut ServerGuard, userinfo: serde_json::Value) -> (Mock, Mock) {
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "code-1".into()),
            Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "at-1", "token_type": "Bearer"}"#)
        .create_async()
        .await;

    let profile = server
        .mock("GET", "/userinfo")
        .match_header("authorization", "Bearer at-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(userinfo.to_string())
        .create_async()
        .await;

    (token, profile)
}

/// Start the flow and return the `state` handed to the provider
async fn begin(app: &TestApp) -> String {
    let response = app
        .send(test_request("GET", "/api/auth/oauth/campus", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let url = reqwest::Url::parse(&location(&response)).unwrap();
    assert_eq!(url.path(), "/authorize");
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    assert_eq!(param("client_id").as_deref(), Some("aula-client"));
    assert_eq!(param("response_type").as_deref(), Some("code"));
    assert!(param("redirect_uri")
        .unwrap()
        .ends_with("/api/auth/oauth/campus/callback"));
    param("state").expect("Should carry state")
}

fn callback_uri(state: &str) -> String {
    format!("/api/auth/oauth/campus/callback?code=code-1&state={}", state)
}

fn with_pending_cookie(method: &str, uri: &str, pending: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("aula_pending={}", pending));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// =============================================================================
// OAuth Tests
// =============================================================================

#[tokio::test]
async fn test_oauth_new_user_goes_through_registration() {
    let mut server = Server::new_async().await;
    let (token_mock, profile_mock) = mock_provider(
        &mut server,
        json!({"sub": "abc-1", "email": "Nia@Example.com", "name": "Nia", "picture": "https://img/nia.png"}),
    )
    .await;
    let app = setup_app_with(oauth_config(&server)).await;

    let state = begin(&app).await;
    let response = app.send(test_request("GET", &callback_uri(&state), None, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register/complete");
    let pending = set_cookie_value(&response, "aula_pending").expect("Should stage registration");
    assert!(set_cookie_value(&response, "aula_session").is_none());

    token_mock.assert_async().await;
    profile_mock.assert_async().await;

    // The state is single-use
    app.send_json(
        test_request("GET", &callback_uri(&state), None, None),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let staged = app
        .send_json(
            with_pending_cookie("GET", "/api/auth/registration/pending", &pending, None),
            StatusCode::OK,
        )
        .await;
    assert_eq!(staged["email"], "nia@example.com");
    assert_eq!(staged["provider"], "campus");
    assert!(staged.get("provider_account_id").is_none());

    let done = app
        .send_json(
            with_pending_cookie(
                "POST",
                "/api/auth/registration/complete",
                &pending,
                Some(json!({"name": "Nia Costa"})),
            ),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(done["user"]["name"], "Nia Costa");
    assert_eq!(done["user"]["image"], "https://img/nia.png");
    assert_eq!(done["redirect"], "/onboarding");

    // Consumed
    app.send_json(
        with_pending_cookie("GET", "/api/auth/registration/pending", &pending, None),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn test_oauth_linked_user_signs_in_directly() {
    let mut server = Server::new_async().await;
    let _mocks = mock_provider(
        &mut server,
        json!({"id": 4242, "email": "omar@example.com", "avatar_url": "https://img/o.png"}),
    )
    .await;
    let app = setup_app_with(oauth_config(&server)).await;

    // First pass: register through the bridge
    let state = begin(&app).await;
    let response = app.send(test_request("GET", &callback_uri(&state), None, None)).await;
    let pending = set_cookie_value(&response, "aula_pending").unwrap();
    app.send_json(
        with_pending_cookie("POST", "/api/auth/registration/complete", &pending, Some(json!({}))),
        StatusCode::CREATED,
    )
    .await;

    // Second pass: known identity, straight to a session
    let state = begin(&app).await;
    let response = app.send(test_request("GET", &callback_uri(&state), None, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/onboarding");
    assert!(set_cookie_value(&response, "aula_session").is_some());
    assert!(set_cookie_value(&response, "aula_pending").is_none());
}

#[tokio::test]
async fn test_oauth_links_existing_email() {
    let mut server = Server::new_async().await;
    let _mocks = mock_provider(&mut server, json!({"sub": "xyz", "email": "ana@example.com"})).await;
    let app = setup_app_with(oauth_config(&server)).await;
    register_onboarded(&app, "ana@example.com").await;

    let state = begin(&app).await;
    let response = app.send(test_request("GET", &callback_uri(&state), None, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    assert!(set_cookie_value(&response, "aula_session").is_some());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_oauth_rejects_bad_state_and_refusal() {
    let server = Server::new_async().await;
    let app = setup_app_with(oauth_config(&server)).await;

    app.send_json(
        test_request("GET", &callback_uri("forged"), None, None),
        StatusCode::BAD_REQUEST,
    )
    .await;

    app.send_json(
        test_request(
            "GET",
            "/api/auth/oauth/campus/callback?error=access_denied",
            None,
            None,
        ),
        StatusCode::UNAUTHORIZED,
    )
    .await;

    app.send_json(
        test_request("GET", "/api/auth/oauth/nowhere", None, None),
        StatusCode::NOT_FOUND,
    )
    .await;

    app.send_json(
        test_request("GET", "/api/auth/registration/pending", None, None),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn test_oauth_provider_failure_is_bad_gateway() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let app = setup_app_with(oauth_config(&server)).await;

    let state = begin(&app).await;
    app.send_json(
        test_request("GET", &callback_uri(&state), None, None),
        StatusCode::BAD_GATEWAY,
    )
    .await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_registrations")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_expired_pending_registration_is_gone() {
    let mut server = Server::new_async().await;
    let _mocks = mock_provider(&mut server, json!({"sub": "late", "email": "late@example.com"})).await;
    let app = setup_app_with(oauth_config(&server)).await;

    let state = begin(&app).await;
    let response = app.send(test_request("GET", &callback_uri(&state), None, None)).await;
    let pending = set_cookie_value(&response, "aula_pending").unwrap();

    sqlx::query("UPDATE pending_registrations SET expires_at = 0")
        .execute(&app.db)
        .await
        .unwrap();

    app.send_json(
        with_pending_cookie("POST", "/api/auth/registration/complete", &pending, Some(json!({}))),
        StatusCode::GONE,
    )
    .await;
}
