use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/schedule", post(handlers::schedule_reminder))
        .route("/send", post(handlers::send_reminder))
        .route("/logs", get(handlers::get_reminder_logs))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
