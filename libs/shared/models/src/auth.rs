use serde::{Deserialize, Serialize};

/// Identity resolved by the boundary layer (gateway / session service).
/// The core never validates credentials; it only consumes this fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}
