use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/slots", get(handlers::get_available_slots))
        .route("/", post(handlers::book_appointment))
        .route("/", get(handlers::get_appointments))
        .route("/auto-book", post(handlers::auto_book_appointment))
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/agents", post(handlers::trigger_agents))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
