// libs/audit-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Immutable record of one mutation. Entries are appended once and never
/// updated or deleted by this core; after a hard delete of the resource the
/// audit trail is the only remaining trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    /// Pre-mutation snapshot (update, delete). Secret fields are stripped.
    pub before: Option<serde_json::Value>,
    /// Post-mutation snapshot (create, update). Secret fields are stripped.
    pub after: Option<serde_json::Value>,
    /// Top-level field names that differ between `before` and `after`.
    pub changes: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Appointment,
    User,
    Report,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Appointment => write!(f, "appointment"),
            ResourceType::User => write!(f, "user"),
            ResourceType::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogPage {
    pub entries: Vec<AuditLogEntry>,
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
