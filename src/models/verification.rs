use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Entry verification outcome.
    ///
    /// | canonical | also accepted          |
    /// |-----------|------------------------|
    /// | pending   |                        |
    /// | allowed   | approved, verified     |
    /// | denied    | rejected               |
    VerificationStatus {
        Pending => ["pending"],
        Allowed => ["allowed", "approved", "verified"],
        Denied => ["denied", "rejected"],
    }
}

impl VerificationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "Pending",
            VerificationStatus::Allowed => "Allowed",
            VerificationStatus::Denied => "Denied",
            VerificationStatus::Other(_) => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub steam_id: String,
    pub status: VerificationStatus,
    pub reason: Option<String>,
    pub steam_level: Option<i32>,
    pub playtime_minutes: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl VerificationRecord {
    /// Rough 0-100 estimate from the Steam level alone.
    ///
    /// This is a display hint, not the backend's verdict: the backend decides
    /// with rating, level and playtime, none of which the console can see in
    /// full.
    pub fn risk_hint(&self) -> Option<u8> {
        let level = self.steam_level?;
        Some(match level {
            i32::MIN..=0 => 90,
            1..=4 => 70,
            5..=9 => 45,
            10..=29 => 25,
            _ => 10,
        })
    }

    pub fn playtime_hours(&self) -> Option<f32> {
        self.playtime_minutes.map(|m| m as f32 / 60.0)
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateVerificationRequest {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
