use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub servers: Vec<ServerInfo>,
}

/// A server as listed under its group.
///
/// The RCON password is write-only: the backend may send it, but it is never
/// read into this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub ip: String,
    pub port: i32,
    #[serde(default)]
    pub verification_enabled: bool,
    #[serde(default = "default_rating")]
    pub required_rating: f64,
    #[serde(default = "default_level")]
    pub required_level: i32,
    /// When set, the rating/level thresholds are ignored by the backend.
    #[serde(default)]
    pub whitelist_only: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl ServerInfo {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn default_rating() -> f64 {
    3.0
}

fn default_level() -> i32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServerRequest {
    pub group_id: i64,
    pub name: String,
    pub ip: String,
    pub port: i32,
    pub rcon_password: String,
    pub verification_enabled: bool,
    pub required_rating: f64,
    pub required_level: i32,
    pub whitelist_only: bool,
}

impl CreateServerRequest {
    /// Blank form for a new server in `group_id`.
    pub fn blank(group_id: i64) -> Self {
        Self {
            group_id,
            name: String::new(),
            ip: String::new(),
            port: 27015,
            rcon_password: String::new(),
            verification_enabled: false,
            required_rating: default_rating(),
            required_level: default_level(),
            whitelist_only: false,
        }
    }

    pub fn check_request(&self) -> CheckServerRequest {
        CheckServerRequest {
            ip: self.ip.clone(),
            port: self.port,
            rcon_password: self.rcon_password.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcon_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_only: Option<bool>,
}

impl UpdateServerRequest {
    /// Edit form prefilled from the listing. The secret always starts blank.
    pub fn from_server(server: &ServerInfo) -> Self {
        Self {
            name: Some(server.name.clone()),
            ip: Some(server.ip.clone()),
            port: Some(server.port),
            rcon_password: None,
            verification_enabled: Some(server.verification_enabled),
            required_rating: Some(server.required_rating),
            required_level: Some(server.required_level),
            whitelist_only: Some(server.whitelist_only),
        }
    }

    /// A blank password means "keep the current one".
    pub fn with_rcon_password(mut self, password: Option<String>) -> Self {
        self.rcon_password = password.filter(|p| !p.is_empty());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckServerRequest {
    pub ip: String,
    pub port: i32,
    pub rcon_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub userid: i32,
    pub name: String,
    pub steam_id: String,
    /// Connected time as reported by `status`
    pub time: String,
    pub ping: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KickPlayerRequest {
    pub userid: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BanPlayerRequest {
    pub userid: i32,
    pub duration: i64, // minutes, 0 = permanent
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed_server() -> ServerInfo {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "group_id": 1,
            "name": "北京 BGP 1服",
            "ip": "10.0.0.2",
            "port": 27015,
            "rcon_password": "hunter2",
            "verification_enabled": true,
            "required_rating": 4.0,
            "required_level": 2,
            "whitelist_only": false
        }))
        .unwrap()
    }

    #[test]
    fn rcon_password_is_never_carried_into_the_edit_form() {
        let server = listed_server();
        let form = UpdateServerRequest::from_server(&server);
        let body = serde_json::to_value(&form).unwrap();
        assert!(body.get("rcon_password").is_none());
        assert_eq!(body["required_rating"], 4.0);

        let form = form.with_rcon_password(Some(String::new()));
        assert!(form.rcon_password.is_none());
        let form = UpdateServerRequest::from_server(&server).with_rcon_password(Some("new".into()));
        assert_eq!(form.rcon_password.as_deref(), Some("new"));
    }

    #[test]
    fn blank_create_form_defaults() {
        let form = CreateServerRequest::blank(3);
        assert_eq!(form.port, 27015);
        assert_eq!(form.required_rating, 3.0);
        assert_eq!(form.required_level, 1);
        assert_eq!(form.check_request().port, 27015);
    }
}
