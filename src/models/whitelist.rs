use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    WhitelistStatus {
        Pending => ["pending"],
        Approved => ["approved"],
        Rejected => ["rejected"],
    }
}

impl WhitelistStatus {
    pub fn label(&self) -> &'static str {
        match self {
            WhitelistStatus::Pending => "Pending",
            WhitelistStatus::Approved => "Approved",
            WhitelistStatus::Rejected => "Rejected",
            WhitelistStatus::Other(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: i64,
    pub steam_id: String,
    pub steam_id_3: Option<String>,
    pub steam_id_64: Option<String>,
    pub name: String,
    pub status: WhitelistStatus,
    pub reject_reason: Option<String>,
    pub admin_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl WhitelistEntry {
    /// Entries filed through the public form carry no admin.
    pub fn is_self_submitted(&self) -> bool {
        super::present(self.admin_name.as_deref()).is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWhitelistRequest {
    pub steam_id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyWhitelistRequest {
    pub steam_id: String,
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RejectWhitelistRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistStatusResponse {
    pub status: WhitelistStatus,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

/// Display name resolved by the backend from any SteamID format or profile URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerInfo {
    pub personaname: String,
    #[serde(default)]
    pub steam_id_64: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}
