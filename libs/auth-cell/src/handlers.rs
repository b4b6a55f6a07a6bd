use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_models::records::UserRole;
use shared_utils::jwt::create_token;
use shared_utils::password::{hash_password, verify_password};

use crate::models::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};

#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    if request.password.len() < 6 {
        return Err(AppError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(AppError::ValidationError("Invalid email address".to_string()));
    }

    let store = SupabaseClient::new(&config);

    let path = format!("/rest/v1/users?email=eq.{}", urlencoding::encode(&request.email));
    let existing: Vec<Value> = store
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if !existing.is_empty() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let row = json!({
        "email": request.email,
        "password_hash": password_hash,
        "full_name": request.full_name,
        "role": request.role,
        "phone": request.phone,
        "specialty": request.specialty,
        "bio": request.bio,
        "created_at": Utc::now().to_rfc3339(),
    });

    let inserted = store
        .insert_returning("users", row)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let user_row = inserted
        .first()
        .ok_or_else(|| AppError::Database("Failed to create user".to_string()))?;
    let user_id = user_row["id"]
        .as_str()
        .ok_or_else(|| AppError::Database("Created user has no id".to_string()))?;

    let access_token = create_token(
        user_id,
        &request.email,
        request.role,
        &config.jwt_secret,
        config.token_expire_minutes,
    )
    .map_err(AppError::Internal)?;

    info!("User registered: {} (Role: {})", request.email, request.role);

    let user = UserResponse::from_row(user_id, user_row, request.role);
    Ok((StatusCode::CREATED, Json(TokenResponse::bearer(access_token, user))))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let store = SupabaseClient::new(&config);

    let path = format!(
        "/rest/v1/users?email=eq.{}&limit=1",
        urlencoding::encode(&request.email)
    );
    let rows: Vec<Value> = store
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let Some(user_row) = rows.first() else {
        return Err(AppError::Auth("Incorrect email or password".to_string()));
    };

    let stored_hash = user_row["password_hash"].as_str().unwrap_or_default();
    let verified = verify_password(&request.password, stored_hash).unwrap_or(false);
    if !verified {
        return Err(AppError::Auth("Incorrect email or password".to_string()));
    }

    let user_id = user_row["id"]
        .as_str()
        .ok_or_else(|| AppError::Database("User row has no id".to_string()))?;
    let role: UserRole = user_row["role"]
        .as_str()
        .unwrap_or("patient")
        .parse()
        .map_err(AppError::Auth)?;

    let access_token = create_token(
        user_id,
        &request.email,
        role,
        &config.jwt_secret,
        config.token_expire_minutes,
    )
    .map_err(AppError::Internal)?;

    info!("User logged in: {}", request.email);

    let user = UserResponse::from_row(user_id, user_row, role);
    Ok(Json(TokenResponse::bearer(access_token, user)))
}

#[axum::debug_handler]
pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    debug!("Fetching profile for user: {}", user.id);

    let store = SupabaseClient::new(&config);

    let path = format!("/rest/v1/users?id=eq.{}", user.id);
    let rows: Vec<Value> = store
        .request(Method::GET, &path, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let Some(user_row) = rows.first() else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    Ok(Json(UserResponse::from_row(&user.id, user_row, user.role)))
}
