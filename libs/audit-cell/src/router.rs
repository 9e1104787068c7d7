// libs/audit-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::identity_middleware;

use crate::handlers;

pub fn audit_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_audit_logs))
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
