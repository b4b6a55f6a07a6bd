use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn questionnaire_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/submit", post(handlers::submit_questionnaire))
        .route("/{appointment_id}", get(handlers::get_questionnaire))
        .route("/{appointment_id}/summary", get(handlers::get_questionnaire_summary))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
