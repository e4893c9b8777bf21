use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub admin_username: String,
    /// Tag such as `create_ban` or `kick_player`
    pub action: String,
    pub target: Option<String>,
    pub details: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
