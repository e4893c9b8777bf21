//! Community view: server groups, their servers and the live player panel.

use reqwest::Method;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{confirm_locked, run_action, ActionOutcome, Messages};
use crate::action_lock::ActionLock;
use crate::client::{expect_ok, ApiClient};
use crate::controller::{FetchController, InFlight, Refresh, RefreshOutcome, Resource};
use crate::cooldown::Cooldown;
use crate::dialog::{describe_failure, ConfirmDialog};
use crate::error::ApiResult;
use crate::filter::filter;
use crate::models::server::{
    BanPlayerRequest, CreateGroupRequest, CreateServerRequest, KickPlayerRequest, Player, ServerGroup,
    ServerInfo, UpdateServerRequest,
};
use crate::notify::Notifier;

pub struct ServerGroups;

impl Resource for ServerGroups {
    type Item = ServerGroup;
    const NAME: &'static str = "server groups";
    const ENDPOINTS: &'static [&'static str] = &["/api/server-groups"];
}

pub const KICK_REASON: &str = "Kicked via Web Dash";
pub const BAN_REASON: &str = "Banned via Web Dash";

/// Row target of a kick or in-game ban.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTarget {
    pub server_id: i64,
    pub userid: i32,
    /// Minutes, 0 = permanent. Ignored for kicks.
    pub duration: i64,
}

pub struct CommunityView {
    groups: FetchController<ServerGroups>,
    lock: ActionLock,
    delete_group: ConfirmDialog<i64>,
    delete_server: ConfirmDialog<i64>,
    kick: ConfirmDialog<PlayerTarget>,
    ban: ConfirmDialog<PlayerTarget>,
    players: PlayerPanel,
}

impl CommunityView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            delete_group: ConfirmDialog::new(notifier.clone(), "Group deleted", "Failed to delete group"),
            delete_server: ConfirmDialog::new(notifier.clone(), "Server removed", "Failed to remove server"),
            kick: ConfirmDialog::new(notifier.clone(), "Player kicked", "Failed to kick player"),
            ban: ConfirmDialog::new(notifier.clone(), "Player banned", "Failed to ban player"),
            players: PlayerPanel::new(client.clone(), notifier.clone()),
            groups: FetchController::new(client, notifier),
            lock: ActionLock::new(),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.groups.refresh().await
    }

    pub fn controller(&self) -> &FetchController<ServerGroups> {
        &self.groups
    }

    pub fn lock(&self) -> &ActionLock {
        &self.lock
    }

    pub fn items(&self) -> Arc<Vec<ServerGroup>> {
        self.groups.items()
    }

    pub fn search<'a>(&self, items: &'a [ServerGroup], query: &str) -> Vec<&'a ServerGroup> {
        filter(items, query)
    }

    pub fn find_server(&self, server_id: i64) -> Option<ServerInfo> {
        self.groups
            .items()
            .iter()
            .flat_map(|g| g.servers.iter())
            .find(|s| s.id == server_id)
            .cloned()
    }

    pub async fn create_group(&self, name: &str) -> ActionOutcome {
        let client = self.groups.client();
        let body = CreateGroupRequest { name: name.to_string() };
        run_action(
            &self.lock,
            "create_group",
            name,
            self.groups.notifier(),
            Messages::new("Group created successfully", "Failed to create group"),
            &self.groups,
            client.mutate(Method::POST, "/api/server-groups", Some(&body)),
        )
        .await
    }

    pub fn stage_delete_group(&self, id: i64) -> bool {
        self.delete_group.stage(id)
    }

    pub async fn confirm_delete_group(&self) -> ActionOutcome {
        let client = self.groups.client();
        confirm_locked(
            &self.lock,
            "delete_group",
            |id| *id,
            &self.delete_group,
            &self.groups,
            |id| async move {
                client
                    .mutate::<()>(Method::DELETE, &format!("/api/server-groups/{}", id), None)
                    .await
            },
        )
        .await
        .into()
    }

    /// RCON pre-check, then create. A failed check stops before anything is
    /// saved.
    pub async fn create_server(&self, request: CreateServerRequest) -> ActionOutcome {
        let notifier = self.groups.notifier();
        let Some(_guard) = self.lock.try_acquire("create_server", request.group_id) else {
            return ActionOutcome::Busy;
        };

        if let Err(e) = self.check_rcon(&request).await {
            tracing::warn!(ip = %request.ip, port = request.port, "RCON check failed: {}", e);
            notifier.error(format!("RCON check failed: {}", e.detail()));
            return ActionOutcome::Failed(e);
        }

        match self
            .groups
            .client()
            .mutate(Method::POST, "/api/servers", Some(&request))
            .await
        {
            Ok(()) => {
                self.groups.refresh().await;
                notifier.success("Server verified and added successfully");
                ActionOutcome::Done
            }
            Err(e) => {
                notifier.error(describe_failure(
                    "Failed to save server after verification",
                    "Permission denied",
                    &e,
                ));
                ActionOutcome::Failed(e)
            }
        }
    }

    async fn check_rcon(&self, request: &CreateServerRequest) -> ApiResult<()> {
        let response = self
            .groups
            .client()
            .send_json(Method::POST, "/api/servers/check", &request.check_request())
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    pub async fn update_server(&self, id: i64, request: UpdateServerRequest) -> ActionOutcome {
        let client = self.groups.client();
        let endpoint = format!("/api/servers/{}", id);
        run_action(
            &self.lock,
            "update_server",
            id,
            self.groups.notifier(),
            Messages::new("Server updated", "Failed to update server"),
            &self.groups,
            client.mutate(Method::PUT, &endpoint, Some(&request)),
        )
        .await
    }

    pub fn stage_delete_server(&self, id: i64) -> bool {
        self.delete_server.stage(id)
    }

    pub async fn confirm_delete_server(&self) -> ActionOutcome {
        let client = self.groups.client();
        let target = self.delete_server.staged();
        let outcome: ActionOutcome = confirm_locked(
            &self.lock,
            "delete_server",
            |id| *id,
            &self.delete_server,
            &self.groups,
            |id| async move {
                client
                    .mutate::<()>(Method::DELETE, &format!("/api/servers/{}", id), None)
                    .await
            },
        )
        .await
        .into();

        if outcome.is_done() && target.is_some() && self.players.server_id() == target {
            self.players.close();
        }
        outcome
    }

    pub fn players(&self) -> &PlayerPanel {
        &self.players
    }

    pub fn stage_kick(&self, userid: i32) -> bool {
        match self.players.server_id() {
            Some(server_id) => self.kick.stage(PlayerTarget {
                server_id,
                userid,
                duration: 0,
            }),
            None => false,
        }
    }

    pub async fn confirm_kick(&self) -> ActionOutcome {
        let client = self.groups.client();
        confirm_locked(
            &self.lock,
            "kick",
            |t| i64::from(t.userid),
            &self.kick,
            &self.players,
            |t| async move {
                let body = KickPlayerRequest {
                    userid: t.userid,
                    reason: Some(KICK_REASON.to_string()),
                };
                client
                    .mutate(Method::POST, &format!("/api/servers/{}/kick", t.server_id), Some(&body))
                    .await
            },
        )
        .await
        .into()
    }

    pub fn stage_ban(&self, userid: i32, duration: i64) -> bool {
        match self.players.server_id() {
            Some(server_id) => self.ban.stage(PlayerTarget {
                server_id,
                userid,
                duration,
            }),
            None => false,
        }
    }

    pub async fn confirm_ban(&self) -> ActionOutcome {
        let client = self.groups.client();
        confirm_locked(
            &self.lock,
            "ban_player",
            |t| i64::from(t.userid),
            &self.ban,
            &self.players,
            |t| async move {
                let body = BanPlayerRequest {
                    userid: t.userid,
                    duration: t.duration,
                    reason: Some(BAN_REASON.to_string()),
                };
                client
                    .mutate(Method::POST, &format!("/api/servers/{}/ban", t.server_id), Some(&body))
                    .await
            },
        )
        .await
        .into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualRefresh {
    Refreshed(RefreshOutcome),
    CoolingDown { remaining_secs: u64 },
    NoServer,
}

struct PanelState {
    server_id: Option<i64>,
    players: Arc<Vec<Player>>,
    cooldown: Cooldown,
}

/// Live player list of one server, fetched over RCON by the backend.
///
/// Every fetch, whether from opening, the refresh button or the reload after
/// a kick or ban, goes through one cooldown. Opening another server starts
/// it over.
pub struct PlayerPanel {
    client: ApiClient,
    notifier: Notifier,
    state: Mutex<PanelState>,
    in_flight: AtomicUsize,
}

impl PlayerPanel {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            client,
            notifier,
            state: Mutex::new(PanelState {
                server_id: None,
                players: Arc::new(Vec::new()),
                cooldown: Cooldown::default(),
            }),
            in_flight: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn server_id(&self) -> Option<i64> {
        self.lock().server_id
    }

    pub fn players(&self) -> Arc<Vec<Player>> {
        self.lock().players.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.lock().cooldown.remaining_secs()
    }

    pub async fn open(&self, server_id: i64) -> RefreshOutcome {
        {
            let mut state = self.lock();
            if state.server_id != Some(server_id) {
                state.cooldown.reset();
                state.players = Arc::new(Vec::new());
            }
            state.server_id = Some(server_id);
        }
        self.gated_fetch().await
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.server_id = None;
        state.players = Arc::new(Vec::new());
    }

    /// The refresh button.
    pub async fn manual_refresh(&self) -> ManualRefresh {
        match self.try_start() {
            Ok(server_id) => ManualRefresh::Refreshed(self.fetch(server_id).await),
            Err(refused) => refused,
        }
    }

    /// Claims the cooldown for the open server.
    fn try_start(&self) -> Result<i64, ManualRefresh> {
        let mut state = self.lock();
        let Some(server_id) = state.server_id else {
            return Err(ManualRefresh::NoServer);
        };
        if !state.cooldown.try_start() {
            return Err(ManualRefresh::CoolingDown {
                remaining_secs: state.cooldown.remaining_secs(),
            });
        }
        Ok(server_id)
    }

    async fn gated_fetch(&self) -> RefreshOutcome {
        match self.try_start() {
            Ok(server_id) => self.fetch(server_id).await,
            Err(ManualRefresh::NoServer) => RefreshOutcome::Failed,
            Err(_) => {
                tracing::debug!("player list still cooling down");
                RefreshOutcome::Skipped
            }
        }
    }

    async fn fetch(&self, server_id: i64) -> RefreshOutcome {
        let _loading = InFlight::enter(&self.in_flight);

        let result = self
            .client
            .get_json::<Vec<Player>>(&format!("/api/servers/{}/players", server_id))
            .await;

        let mut state = self.lock();
        if state.server_id != Some(server_id) {
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(players) => {
                state.players = Arc::new(players);
                RefreshOutcome::Applied
            }
            Err(e) => {
                // An unreachable server has no players to show.
                state.players = Arc::new(Vec::new());
                drop(state);
                tracing::warn!(server_id, "Failed to fetch players: {}", e);
                self.notifier.error(format!("Failed to fetch players: {}", e.detail()));
                RefreshOutcome::Failed
            }
        }
    }
}

impl Refresh for PlayerPanel {
    fn refresh(&self) -> impl Future<Output = RefreshOutcome> + Send {
        self.gated_fetch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;

    fn panel() -> PlayerPanel {
        let (notifier, _rx) = Notifier::channel();
        let client = ApiClient::new("http://127.0.0.1:9", SessionStore::new("/nonexistent/session.json"));
        PlayerPanel::new(client, notifier)
    }

    #[tokio::test]
    async fn manual_refresh_needs_an_open_server() {
        let p = panel();
        assert_eq!(p.manual_refresh().await, ManualRefresh::NoServer);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_restarts_for_another_server() {
        let p = panel();
        {
            let mut state = p.lock();
            state.server_id = Some(1);
            assert!(state.cooldown.try_start());
        }
        assert_eq!(p.cooldown_secs(), 5);
        assert!(matches!(
            p.manual_refresh().await,
            ManualRefresh::CoolingDown { remaining_secs: 5 }
        ));

        // nothing listens on port 9, so the fetch fails and clears the list
        assert_eq!(p.open(2).await, RefreshOutcome::Failed);
        assert_eq!(p.cooldown_secs(), 5);
        assert!(p.players().is_empty());
        assert!(!p.is_loading());
    }
}
