use std::sync::Arc;

use axum::{routing::get, Router};

use analytics_cell::router::analytics_routes;
use appointment_cell::router::appointment_routes;
use audit_cell::router::audit_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "LabOps back-office API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/audit-logs", audit_routes(state.clone()))
        .nest("/analytics", analytics_routes(state.clone()))
}
