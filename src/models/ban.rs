use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::deserialize_minutes;

status_enum! {
    BanStatus {
        Active => ["active"],
        Expired => ["expired"],
    }
}

status_enum! {
    BanType {
        Account => ["account"],
        Ip => ["ip"],
    }
}

impl Default for BanType {
    fn default() -> Self {
        BanType::Account
    }
}

impl BanStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BanStatus::Active => "Active",
            BanStatus::Expired => "Expired",
            BanStatus::Other(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub id: i64,
    pub name: Option<String>,
    pub steam_id: String,
    pub steam_id_3: Option<String>,
    pub steam_id_64: Option<String>,
    pub ip: Option<String>,
    #[serde(default)]
    pub ban_type: BanType,
    pub reason: Option<String>,
    /// Minutes, 0 = permanent
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub duration: i64,
    pub status: BanStatus,
    pub admin_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub server_id: Option<i64>,
}

impl Ban {
    pub fn is_permanent(&self) -> bool {
        self.expires_at.is_none() && self.duration == 0
    }

    pub fn is_active(&self) -> bool {
        self.status == BanStatus::Active
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBanRequest {
    pub name: String,
    pub steam_id: String,
    pub ip: String,
    pub ban_type: BanType,
    pub reason: Option<String>,
    /// Minutes, 0 = permanent
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ban_type: Option<BanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BanStatus>,
}

impl UpdateBanRequest {
    pub fn status(status: BanStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// A hit from the bulk global-ban lookup. The payload shape belongs to the
/// aggregator, so only the commonly present fields are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalBan {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub ban_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Keyed by 64-bit SteamID.
pub type GlobalBanMap = HashMap<String, GlobalBan>;

#[derive(Debug, Serialize)]
pub struct BulkGlobalBanRequest {
    pub steam_ids: Vec<String>,
}
