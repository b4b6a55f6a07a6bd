use std::sync::Arc;

use axum::extract::{Extension, Json, State};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::handlers;
use auth_cell::models::{LoginRequest, RegisterRequest};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::records::UserRole;
use shared_utils::password::hash_password;
use shared_utils::test_utils::{TestConfig, TestUser};

fn state(mock_server: &MockServer) -> Arc<AppConfig> {
    Arc::new(TestConfig::with_store_url(&mock_server.uri()).to_app_config())
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "hunter22".to_string(),
        full_name: "Jane Doe".to_string(),
        role: UserRole::Patient,
        phone: None,
        specialty: None,
        bio: None,
    }
}

#[tokio::test]
async fn register_creates_a_user_and_issues_a_token() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.jane@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "email": "jane@example.com", "role": "patient" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {
                "id": user_id,
                "email": "jane@example.com",
                "full_name": "Jane Doe",
                "role": "patient",
                "created_at": "2025-01-01T00:00:00Z",
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = handlers::register(
        State(state(&mock_server)),
        Json(register_request("jane@example.com")),
    )
    .await;

    let (status, Json(token)) = result.unwrap();
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.user.email, "jane@example.com");
    assert_eq!(token.access_token.split('.').count(), 3);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "email": "jane@example.com" }
        ])))
        .mount(&mock_server)
        .await;

    let result = handlers::register(
        State(state(&mock_server)),
        Json(register_request("jane@example.com")),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn short_passwords_fail_validation_before_any_store_call() {
    let mock_server = MockServer::start().await;

    let mut request = register_request("jane@example.com");
    request.password = "short".to_string();

    let result = handlers::register(State(state(&mock_server)), Json(request)).await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn login_verifies_the_stored_hash() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let password_hash = hash_password("hunter22").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.jane@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": user_id,
                "email": "jane@example.com",
                "full_name": "Jane Doe",
                "role": "patient",
                "password_hash": password_hash,
            }
        ])))
        .mount(&mock_server)
        .await;

    let Json(token) = handlers::login(
        State(state(&mock_server)),
        Json(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "hunter22".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(token.user.id, user_id.to_string());

    // Wrong password takes the same "incorrect email or password" path.
    let result = handlers::login(
        State(state(&mock_server)),
        Json(LoginRequest {
            email: "jane@example.com".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await;
    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn me_returns_the_stored_profile() {
    let mock_server = MockServer::start().await;
    let user = TestUser::doctor("doc@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": user.id,
                "email": "doc@example.com",
                "full_name": "Dr. Smith",
                "role": "doctor",
                "specialty": "Cardiologist",
            }
        ])))
        .mount(&mock_server)
        .await;

    let Json(profile) = handlers::me(State(state(&mock_server)), Extension(user.to_auth_user()))
        .await
        .unwrap();

    assert_eq!(profile.full_name, "Dr. Smith");
    assert_eq!(profile.role, UserRole::Doctor);
    assert_eq!(profile.specialty.as_deref(), Some("Cardiologist"));
}
