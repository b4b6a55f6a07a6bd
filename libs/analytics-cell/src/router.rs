use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn analytics_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/stats", get(handlers::get_stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
