// libs/analytics-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::AnalyticsSnapshot;
use crate::services::dashboard::DashboardService;

/// The snapshot itself never fails; sections degrade individually.
#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<AnalyticsSnapshot>, AppError> {
    require_admin(&user)?;

    let service = DashboardService::new(&state);
    Ok(Json(service.snapshot().await))
}
