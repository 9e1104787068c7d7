use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validated entity identifier. Raw request strings are parsed into this
/// newtype once at the boundary; everything past the boundary works with
/// typed ids only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an external identifier. Rejects empty and structurally
    /// malformed values.
    pub fn parse(raw: &str) -> Result<Self, InvalidEntityId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidEntityId(raw.to_string()));
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| InvalidEntityId(raw.to_string()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid entity identifier: {0:?}")]
pub struct InvalidEntityId(pub String);
