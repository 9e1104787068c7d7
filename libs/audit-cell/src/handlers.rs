// libs/audit-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::ids::EntityId;
use shared_utils::extractor::require_admin;

use crate::models::ResourceType;
use crate::services::recorder::AuditRecorderService;

const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<EntityId>,
    pub actor_id: Option<EntityId>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

/// Read-only view over the audit trail. The trail itself is append-only;
/// no mutation surface exists for it anywhere in this API.
#[axum::debug_handler]
pub async fn list_audit_logs(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AuditLogQueryParams>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let recorder = AuditRecorderService::new(&state);

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let skip = params.skip.unwrap_or(0);

    let page = recorder
        .list(
            params.resource_type,
            params.resource_id,
            params.actor_id,
            limit,
            skip,
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "entries": page.entries,
        "total_count": page.total_count,
        "total_pages": page.total_pages,
        "current_page": page.current_page
    })))
}
