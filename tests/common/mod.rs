//! In-process fake of the KZGuard backend, just enough of its routes for the
//! console's integration tests.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use kzguard_console::models::user::{Role, SessionUser};
use kzguard_console::notify::Notification;
use kzguard_console::session::{Session, SessionStore};
use kzguard_console::{ApiClient, Notifier};

pub const SUPER_TOKEN: &str = "super-token";
pub const ADMIN_TOKEN: &str = "admin-token";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    pub requests: Vec<Recorded>,
    pub bans: Vec<Value>,
    pub whitelist: Vec<Value>,
    pub players: Vec<Value>,
    pub servers: Vec<Value>,
    pub global_bans: HashMap<String, Value>,
    pub bulk_bodies: Vec<Value>,
    pub fail_global_lookup: bool,
    pub fail_ban_list: bool,
    pub fail_pending_list: bool,
    pub fail_approve: HashSet<i64>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub addr: SocketAddr,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/bans", get(list_bans).post(create_ban))
            .route("/api/bans/public", get(list_bans))
            .route("/api/bans/:id", put(update_ban).delete(delete_ban))
            .route("/api/whitelist", get(list_approved))
            .route("/api/whitelist/pending", get(list_pending))
            .route("/api/whitelist/rejected", get(list_rejected))
            .route("/api/whitelist/:id/approve", put(approve))
            .route("/api/whitelist/apply", post(apply))
            .route("/api/whitelist/status", get(application_status))
            .route("/api/check_global_ban/bulk", post(bulk_global_bans))
            .route("/api/server-groups", get(|| async { Json(json!([])) }))
            .route("/api/servers", post(create_server))
            .route("/api/servers/check", post(check_server))
            .route("/api/servers/:id/players", get(players))
            .route("/api/servers/:id/kick", post(|| async { Json(json!("Player kicked")) }))
            .route("/api/verifications", get(|| async { Json(json!([])) }))
            .route("/api/verifications/:steam_id", put(|| async { Json(json!("Updated")) }))
            .route("/api/echo", post(echo))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// A client whose session file holds `token`, or no session at all.
    pub fn client(&self, token: Option<&str>) -> ApiClient {
        let path = std::env::temp_dir().join(format!("kzguard-it-{}.json", uuid::Uuid::new_v4()));
        let store = SessionStore::new(path);
        if let Some(token) = token {
            let role = if token == SUPER_TOKEN { Role::SuperAdmin } else { Role::Admin };
            store
                .save(&Session {
                    token: token.to_string(),
                    user: Some(SessionUser {
                        username: "tester".to_string(),
                        role,
                    }),
                })
                .unwrap();
        }
        ApiClient::new(self.url(), store)
    }
}

pub fn notifier() -> (Notifier, tokio::sync::mpsc::UnboundedReceiver<Notification>) {
    Notifier::channel()
}

pub fn ban_json(id: i64, steam_id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": format!("player{id}"),
        "steam_id": steam_id,
        "ip": "",
        "ban_type": "account",
        "reason": "cheating",
        "duration": "0",
        "status": status,
        "admin_name": "root",
        "created_at": "2026-01-01T00:00:00Z",
        "expires_at": null
    })
}

pub fn whitelist_json(id: i64, steam_id: &str, steam_id_64: &str, status: &str) -> Value {
    json!({
        "id": id,
        "steam_id": steam_id,
        "steam_id_64": steam_id_64,
        "name": format!("applicant{id}"),
        "status": status,
        "admin_name": null,
        "created_at": "2026-01-02T00:00:00Z"
    })
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = {
        let header_value = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
        }
    };
    state.lock().unwrap().requests.push(recorded);
    next.run(request).await
}

async fn login(Json(body): Json<Value>) -> Response {
    let user = body["username"].as_str().unwrap_or_default();
    let pass = body["password"].as_str().unwrap_or_default();
    match (user, pass) {
        ("root", "secret") => Json(json!({
            "token": SUPER_TOKEN,
            "user": { "username": "root", "role": "super_admin" }
        }))
        .into_response(),
        ("mod", "secret") => Json(json!({ "token": ADMIN_TOKEN })).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid credentials" }))).into_response(),
    }
}

async fn list_bans(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.fail_ban_list {
        return (StatusCode::INTERNAL_SERVER_ERROR, "ban table locked").into_response();
    }
    Json(state.bans.clone()).into_response()
}

async fn create_ban(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let id = state.next_id();
    let minutes = body["duration"].as_i64().unwrap_or(0);
    let expires_at = if minutes > 0 {
        json!((chrono::Utc::now() + chrono::Duration::minutes(minutes)).to_rfc3339())
    } else {
        Value::Null
    };
    let ban = json!({
        "id": id,
        "name": body["name"],
        "steam_id": body["steam_id"],
        "ip": body["ip"],
        "ban_type": body["ban_type"],
        "reason": body["reason"],
        "duration": minutes.to_string(),
        "status": "active",
        "admin_name": body["admin_name"],
        "created_at": chrono::Utc::now().to_rfc3339(),
        "expires_at": expires_at
    });
    state.bans.push(ban.clone());
    (StatusCode::CREATED, Json(ban)).into_response()
}

async fn update_ban(State(state): State<Shared>, Path(id): Path<i64>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let Some(ban) = state.bans.iter_mut().find(|b| b["id"] == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Ban not found" }))).into_response();
    };
    if let (Some(target), Some(patch)) = (ban.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(json!("Ban updated")).into_response()
}

async fn delete_ban(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: axum::http::HeaderMap,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != format!("Bearer {SUPER_TOKEN}") {
        return (StatusCode::FORBIDDEN, "Access denied").into_response();
    }
    state.lock().unwrap().bans.retain(|b| b["id"] != id);
    Json(json!("Ban deleted")).into_response()
}

fn whitelist_with(state: &Shared, status: &str) -> Vec<Value> {
    state
        .lock()
        .unwrap()
        .whitelist
        .iter()
        .filter(|e| e["status"] == status)
        .cloned()
        .collect()
}

async fn list_approved(State(state): State<Shared>) -> Json<Vec<Value>> {
    Json(whitelist_with(&state, "approved"))
}

async fn list_pending(State(state): State<Shared>) -> Response {
    if state.lock().unwrap().fail_pending_list {
        return (StatusCode::BAD_GATEWAY, "upstream down").into_response();
    }
    Json(whitelist_with(&state, "pending")).into_response()
}

async fn list_rejected(State(state): State<Shared>) -> Json<Vec<Value>> {
    Json(whitelist_with(&state, "rejected"))
}

async fn approve(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut state = state.lock().unwrap();
    if state.fail_approve.contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "db write failed" }))).into_response();
    }
    match state.whitelist.iter_mut().find(|e| e["id"] == id) {
        Some(entry) => {
            entry["status"] = json!("approved");
            entry["admin_name"] = json!("root");
            Json(json!("Approved")).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn apply(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let steam_id = body["steam_id"].clone();
    if let Some(existing) = state.whitelist.iter().find(|e| e["steam_id"] == steam_id) {
        let status = existing["status"].clone();
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Application already exists", "status": status })),
        )
            .into_response();
    }
    let id = state.next_id();
    state.whitelist.push(json!({
        "id": id,
        "steam_id": steam_id,
        "name": body["name"],
        "status": "pending",
        "admin_name": null
    }));
    (StatusCode::CREATED, Json(json!("Application submitted"))).into_response()
}

async fn application_status(State(state): State<Shared>, Query(params): Query<HashMap<String, String>>) -> Response {
    let state = state.lock().unwrap();
    let steam_id = params.get("steam_id").cloned().unwrap_or_default();
    match state.whitelist.iter().find(|e| e["steam_id"] == steam_id.as_str()) {
        Some(entry) => Json(json!({ "status": entry["status"], "reject_reason": null })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn bulk_global_bans(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.bulk_bodies.push(body.clone());
    if state.fail_global_lookup {
        return (StatusCode::SERVICE_UNAVAILABLE, "GOKZ API unreachable").into_response();
    }
    let mut answer = serde_json::Map::new();
    for id in body["steam_ids"].as_array().into_iter().flatten() {
        if let Some(key) = id.as_str() {
            let value = state.global_bans.get(key).cloned().unwrap_or(Value::Null);
            answer.insert(key.to_string(), value);
        }
    }
    Json(Value::Object(answer)).into_response()
}

async fn check_server(Json(body): Json<Value>) -> Response {
    if body["rcon_password"] == "wrong" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "RCON authentication failed" }))).into_response();
    }
    Json(json!("ok")).into_response()
}

async fn create_server(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.lock().unwrap().servers.push(body);
    (StatusCode::CREATED, Json(json!("Server created"))).into_response()
}

async fn players(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    if id == 99 {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "RCON timeout" }))).into_response();
    }
    Json(state.lock().unwrap().players.clone()).into_response()
}

async fn echo() -> Response {
    (StatusCode::IM_A_TEAPOT, Json(json!({ "message": "short and stout" }))).into_response()
}
