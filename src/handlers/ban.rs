use reqwest::Method;
use std::sync::Arc;

use super::{confirm_locked, run_action, ActionOutcome, Messages};
use crate::action_lock::ActionLock;
use crate::client::ApiClient;
use crate::controller::{FetchController, RefreshOutcome, Resource};
use crate::dialog::ConfirmDialog;
use crate::error::ApiResult;
use crate::filter::{filter, StatusBuckets, BAN_TABS};
use crate::models::ban::{Ban, BanStatus, CreateBanRequest, UpdateBanRequest};
use crate::notify::Notifier;

pub struct Bans;

impl Resource for Bans {
    type Item = Ban;
    const NAME: &'static str = "bans";
    const ENDPOINTS: &'static [&'static str] = &["/api/bans"];
}

pub const DELETE_DENIED: &str = "Permission denied: only super admins can delete bans";

pub struct BanView {
    bans: FetchController<Bans>,
    lock: ActionLock,
    delete: ConfirmDialog<i64>,
}

impl BanView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            delete: ConfirmDialog::new(notifier.clone(), "Ban deleted", "Failed to delete ban")
                .denied(DELETE_DENIED),
            bans: FetchController::new(client, notifier),
            lock: ActionLock::new(),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.bans.refresh().await
    }

    pub fn controller(&self) -> &FetchController<Bans> {
        &self.bans
    }

    pub fn lock(&self) -> &ActionLock {
        &self.lock
    }

    pub fn items(&self) -> Arc<Vec<Ban>> {
        self.bans.items()
    }

    /// Search then split into active/expired tabs.
    pub fn tabs<'a>(&self, items: &'a [Ban], query: &str) -> StatusBuckets<'a, Ban> {
        StatusBuckets::partition(BAN_TABS, filter(items, query))
    }

    pub async fn create(&self, request: CreateBanRequest) -> ActionOutcome {
        let client = self.bans.client();
        run_action(
            &self.lock,
            "create_ban",
            &request.steam_id,
            self.bans.notifier(),
            Messages::new("Ban created", "Failed to create ban"),
            &self.bans,
            client.mutate(Method::POST, "/api/bans", Some(&request)),
        )
        .await
    }

    pub async fn update(&self, id: i64, request: UpdateBanRequest) -> ActionOutcome {
        let client = self.bans.client();
        let endpoint = format!("/api/bans/{}", id);
        run_action(
            &self.lock,
            "update_ban",
            id,
            self.bans.notifier(),
            Messages::new("Ban updated", "Failed to update ban"),
            &self.bans,
            client.mutate(Method::PUT, &endpoint, Some(&request)),
        )
        .await
    }

    /// Soft unban: the record stays, its status flips to expired.
    pub async fn lift(&self, id: i64) -> ActionOutcome {
        self.set_status(id, "lift_ban", BanStatus::Expired, "Ban lifted", "Failed to lift ban")
            .await
    }

    pub async fn reban(&self, id: i64) -> ActionOutcome {
        self.set_status(id, "reban", BanStatus::Active, "Ban reinstated", "Failed to reinstate ban")
            .await
    }

    async fn set_status(
        &self,
        id: i64,
        operation: &str,
        status: BanStatus,
        success: &str,
        failure: &str,
    ) -> ActionOutcome {
        let client = self.bans.client();
        let endpoint = format!("/api/bans/{}", id);
        let body = UpdateBanRequest::status(status);
        run_action(
            &self.lock,
            operation,
            id,
            self.bans.notifier(),
            Messages::new(success, failure),
            &self.bans,
            client.mutate(Method::PUT, &endpoint, Some(&body)),
        )
        .await
    }

    pub fn delete_dialog(&self) -> &ConfirmDialog<i64> {
        &self.delete
    }

    pub fn stage_delete(&self, id: i64) -> bool {
        self.delete.stage(id)
    }

    pub async fn confirm_delete(&self) -> ActionOutcome {
        let client = self.bans.client();
        confirm_locked(&self.lock, "delete_ban", |id| *id, &self.delete, &self.bans, |id| async move {
            client
                .mutate::<()>(Method::DELETE, &format!("/api/bans/{}", id), None)
                .await
        })
        .await
        .into()
    }
}

/// The unauthenticated ban list shown on the public page.
pub async fn public_bans(client: &ApiClient) -> ApiResult<Vec<Ban>> {
    client.get_json("/api/bans/public").await
}
