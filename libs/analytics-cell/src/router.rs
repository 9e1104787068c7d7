// libs/analytics-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::identity_middleware;

use crate::handlers;

pub fn analytics_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
