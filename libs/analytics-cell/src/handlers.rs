use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::services::dashboard::AnalyticsService;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AnalyticsService::new(&state);

    let dashboard = service
        .dashboard(&user)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(dashboard))
}

#[axum::debug_handler]
pub async fn get_stats(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<StatsQuery>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Operation requires one of these roles: doctor, admin".to_string(),
        ));
    }

    let service = AnalyticsService::new(&state);

    let stats = service
        .stats(query.days.unwrap_or(30), &user)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(stats))
}
