use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use auth_cell::services::password::hash_password;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::TestConfig;

fn create_test_app(store_url: &str) -> (Router, TestConfig) {
    let config = TestConfig::with_store_url(store_url);
    (auth_routes(config.to_arc()), config)
}

fn user_row(id: Uuid, name: &str, email: &str, password_hash: &str, role: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "email": email,
        "password_hash": password_hash,
        "role": role,
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339()
    })
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_register_success() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user_id = Uuid::new_v4();

    // No existing user with this email
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            user_row(user_id, "Tom Lee", "tom@example.com", "$argon2id$stub", "patient")
        ])))
        .mount(&mock_server)
        .await;

    let request = json_request(
        "POST",
        "/register",
        json!({
            "name": "Tom Lee",
            "email": "tom@example.com",
            "password": "correct horse battery staple",
            "role": "patient"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["user"]["email"], "tom@example.com");
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let identity = validate_token(token, &config.jwt_secret).unwrap();
    assert_eq!(identity.id, user_id);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.taken@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let request = json_request(
        "POST",
        "/register",
        json!({
            "name": "Someone Else",
            "email": "taken@example.com",
            "password": "a-perfectly-fine-password",
            "role": "doctor"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_invalid_role() {
    // Role validation happens before any storage access, so no mocks.
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let request = json_request(
        "POST",
        "/register",
        json!({
            "name": "Tom Lee",
            "email": "tom@example.com",
            "password": "whatever",
            "role": "admin"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_unknown_fields() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let request = json_request(
        "POST",
        "/register",
        json!({
            "name": "Tom Lee",
            "email": "tom@example.com",
            "password": "whatever",
            "role": "patient",
            "is_admin": true
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_success() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user_id = Uuid::new_v4();
    let hash = hash_password("my-login-password").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.tom@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_row(user_id, "Tom Lee", "tom@example.com", &hash, "patient")
        ])))
        .mount(&mock_server)
        .await;

    let request = json_request(
        "POST",
        "/login",
        json!({
            "email": "tom@example.com",
            "password": "my-login-password"
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let token = body["token"].as_str().unwrap();
    let identity = validate_token(token, &config.jwt_secret).unwrap();
    assert_eq!(identity.id, user_id);
    assert_eq!(identity.email.as_deref(), Some("tom@example.com"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let hash = hash_password("the-real-password").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.tom@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_row(Uuid::new_v4(), "Tom Lee", "tom@example.com", &hash, "patient")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.nobody@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let wrong_password = json_request(
        "POST",
        "/login",
        json!({ "email": "tom@example.com", "password": "wrong" }),
    );
    let unknown_email = json_request(
        "POST",
        "/login",
        json!({ "email": "nobody@example.com", "password": "wrong" }),
    );

    let response_a = app.clone().oneshot(wrong_password).await.unwrap();
    let response_b = app.oneshot(unknown_email).await.unwrap();

    assert_eq!(response_a.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_b.status(), StatusCode::UNAUTHORIZED);

    let body_a = response_json(response_a).await;
    let body_b = response_json(response_b).await;
    assert_eq!(body_a["error"], body_b["error"]);
}
