use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use analytics_cell::router::analytics_routes;
use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use questionnaire_cell::router::questionnaire_routes;
use reminder_cell::router::reminder_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Aurora Clinic scheduler API is running!" }))
        .route("/health", get(health_check))
        .with_state(state.clone())
        .nest("/auth", auth_routes(state.clone()))
        .nest("/api/appointments", appointment_routes(state.clone()))
        .nest("/api/reminders", reminder_routes(state.clone()))
        .nest("/api/questionnaires", questionnaire_routes(state.clone()))
        .nest("/api/analytics", analytics_routes(state))
}

async fn health_check(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "configured": config.is_configured(),
        "mock_agents": config.use_mock_agents,
        "mock_email": config.use_mock_email,
    }))
}
