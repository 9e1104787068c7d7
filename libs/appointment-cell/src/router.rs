// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::identity_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations are admin actions.
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", patch(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::delete_appointment))
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
