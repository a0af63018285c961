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

use patient_cell::router::patient_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(store_url: &str) -> (Router, TestConfig) {
    let config = TestConfig::with_store_url(store_url);
    (patient_routes(config.to_arc()), config)
}

/// The auth middleware confirms the token's user still exists.
async fn mount_user_exists(mock_server: &MockServer, user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": user.id }
        ])))
        .mount(mock_server)
        .await;
}

fn patient_row(id: Uuid, owner: Uuid, phone: &str) -> serde_json::Value {
    json!({
        "id": id,
        "first_name": "Tom",
        "last_name": "Lee",
        "date_of_birth": "1991-04-12",
        "gender": "male",
        "address": "12 Harbour Road",
        "phone_number": phone,
        "medical_history": null,
        "owner_user_id": owner,
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339()
    })
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_patient() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            patient_row(patient_id, user.id, "085-1234567")
        ])))
        .mount(&mock_server)
        .await;

    let request = authed_request(
        "POST",
        "/",
        &token,
        Some(json!({
            "first_name": "Tom",
            "last_name": "Lee",
            "date_of_birth": "1991-04-12",
            "gender": "male",
            "address": "12 Harbour Road",
            "phone_number": "085-1234567",
            "medical_history": null
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["patient"]["id"], json!(patient_id));
    assert_eq!(body["patient"]["owner_user_id"], json!(user.id));
}

#[tokio::test]
async fn test_list_patients_is_owner_scoped() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    // Only matches when the owner filter is present in the query.
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("owner_user_id", format!("eq.{}", user.id)))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_row(Uuid::new_v4(), user.id, "085-1234567")
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_patient_not_owned_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    // The store applies id AND owner filters; a foreign patient produces an
    // empty result, indistinguishable from a missing one.
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let foreign_id = Uuid::new_v4();
    let response = app
        .oneshot(authed_request("GET", &format!("/{}", foreign_id), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_patient_replaces_fields() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .and(query_param("owner_user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_row(patient_id, user.id, "086-7654321")
        ])))
        .mount(&mock_server)
        .await;

    let request = authed_request(
        "PUT",
        &format!("/{}", patient_id),
        &token,
        Some(json!({
            "first_name": "Tom",
            "last_name": "Lee",
            "date_of_birth": "1991-04-12",
            "gender": "male",
            "address": "12 Harbour Road",
            "phone_number": "086-7654321",
            "medical_history": null
        })),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["patient"]["phone_number"], "086-7654321");
}

#[tokio::test]
async fn test_delete_patient() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .and(query_param("owner_user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_row(patient_id, user.id, "085-1234567")
        ])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("DELETE", &format!("/{}", patient_id), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_patient_not_owned_is_not_found() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    mount_user_exists(&mock_server, &user).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("DELETE", &format!("/{}", Uuid::new_v4()), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_wrong_secret_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("tom@example.com");
    let token = JwtTestUtils::create_invalid_signature_token(&user);

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_token_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, _config) = create_test_app(&mock_server.uri());

    let token = JwtTestUtils::create_malformed_token();

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_user_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let (app, config) = create_test_app(&mock_server.uri());

    let user = TestUser::patient("gone@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    // Valid signature, but the account no longer exists.
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(authed_request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
