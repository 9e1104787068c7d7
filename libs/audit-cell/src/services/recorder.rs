// libs/audit-cell/src/services/recorder.rs
use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::store::StoreClient;
use shared_models::ids::EntityId;

use crate::models::{AuditAction, AuditError, AuditLogEntry, AuditLogPage, ResourceType};

const AUDIT_COLLECTION: &str = "audit_logs";

/// Fields that must never reach the audit trail, neither as snapshot content
/// nor as a changed-field name.
const SECRET_FIELDS: &[&str] = &["password", "password_hash"];

/// Appends one entry per mutation. Writes are best-effort: the primary
/// mutation has already committed by the time the recorder runs, and a failed
/// audit write is logged and swallowed, never propagated to the caller and
/// never used to roll the mutation back.
pub struct AuditRecorderService {
    store: StoreClient,
}

impl AuditRecorderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn record_create(
        &self,
        actor_id: EntityId,
        resource_type: ResourceType,
        resource_id: EntityId,
        entity: &Value,
    ) {
        let entry = json!({
            "id": Uuid::new_v4(),
            "actor_id": actor_id,
            "action": AuditAction::Create.to_string(),
            "resource_type": resource_type.to_string(),
            "resource_id": resource_id,
            "before": Value::Null,
            "after": sanitize_snapshot(entity.clone()),
            "changes": Vec::<String>::new(),
            "recorded_at": Utc::now().to_rfc3339(),
        });

        self.append(resource_type, resource_id, entry).await;
    }

    pub async fn record_update(
        &self,
        actor_id: EntityId,
        resource_type: ResourceType,
        resource_id: EntityId,
        before: &Value,
        after: &Value,
    ) {
        let before = sanitize_snapshot(before.clone());
        let after = sanitize_snapshot(after.clone());
        let changes = diff_changes(&before, &after);

        let entry = json!({
            "id": Uuid::new_v4(),
            "actor_id": actor_id,
            "action": AuditAction::Update.to_string(),
            "resource_type": resource_type.to_string(),
            "resource_id": resource_id,
            "before": before,
            "after": after,
            "changes": changes,
            "recorded_at": Utc::now().to_rfc3339(),
        });

        self.append(resource_type, resource_id, entry).await;
    }

    pub async fn record_delete(
        &self,
        actor_id: EntityId,
        resource_type: ResourceType,
        resource_id: EntityId,
        entity: &Value,
    ) {
        let entry = json!({
            "id": Uuid::new_v4(),
            "actor_id": actor_id,
            "action": AuditAction::Delete.to_string(),
            "resource_type": resource_type.to_string(),
            "resource_id": resource_id,
            "before": sanitize_snapshot(entity.clone()),
            "after": Value::Null,
            "changes": Vec::<String>::new(),
            "recorded_at": Utc::now().to_rfc3339(),
        });

        self.append(resource_type, resource_id, entry).await;
    }

    async fn append(&self, resource_type: ResourceType, resource_id: EntityId, entry: Value) {
        match self.store.insert::<Value>(AUDIT_COLLECTION, entry).await {
            Ok(_) => {
                debug!("Audit entry appended for {} {}", resource_type, resource_id);
            }
            Err(err) => {
                // Accepted risk: the mutation stays committed and unaudited.
                warn!(
                    "Audit write failed for {} {}: {}",
                    resource_type, resource_id, err
                );
            }
        }
    }

    /// Paginated read of the trail, newest first.
    pub async fn list(
        &self,
        resource_type: Option<ResourceType>,
        resource_id: Option<EntityId>,
        actor_id: Option<EntityId>,
        limit: u64,
        skip: u64,
    ) -> Result<AuditLogPage, AuditError> {
        let mut query_parts = Vec::new();

        if let Some(resource_type) = resource_type {
            query_parts.push(format!("resource_type=eq.{}", resource_type));
        }
        if let Some(resource_id) = resource_id {
            query_parts.push(format!("resource_id=eq.{}", resource_id));
        }
        if let Some(actor_id) = actor_id {
            query_parts.push(format!("actor_id=eq.{}", actor_id));
        }

        query_parts.push("order=recorded_at.desc".to_string());
        query_parts.push(format!("limit={}", limit));
        query_parts.push(format!("offset={}", skip));

        let path = format!("/rest/v1/{}?{}", AUDIT_COLLECTION, query_parts.join("&"));

        let (entries, total_count): (Vec<AuditLogEntry>, u64) = self
            .store
            .fetch_with_count(&path)
            .await
            .map_err(|e| AuditError::DatabaseError(e.to_string()))?;

        Ok(AuditLogPage {
            entries,
            total_count,
            total_pages: total_count.div_ceil(limit.max(1)),
            current_page: skip / limit.max(1) + 1,
        })
    }
}

/// Strip secret fields from a top-level object snapshot.
pub fn sanitize_snapshot(mut snapshot: Value) -> Value {
    if let Some(map) = snapshot.as_object_mut() {
        for field in SECRET_FIELDS {
            map.remove(*field);
        }
    }
    snapshot
}

/// Top-level field names whose values differ between the two snapshots.
/// Fields present on only one side count as changed.
pub fn diff_changes(before: &Value, after: &Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let before_map = before.as_object().unwrap_or(&empty);
    let after_map = after.as_object().unwrap_or(&empty);

    let mut fields: Vec<&String> = before_map.keys().chain(after_map.keys()).collect();
    fields.sort();
    fields.dedup();

    fields
        .into_iter()
        .filter(|field| !SECRET_FIELDS.contains(&field.as_str()))
        .filter(|field| before_map.get(*field) != after_map.get(*field))
        .cloned()
        .collect()
}
