use reqwest::Method;
use std::sync::Arc;

use super::{run_action, ActionOutcome, Messages};
use crate::action_lock::ActionLock;
use crate::client::ApiClient;
use crate::controller::{FetchController, RefreshOutcome, Resource};
use crate::filter::{filter, StatusBuckets, VERIFICATION_TABS};
use crate::models::verification::{UpdateVerificationRequest, VerificationRecord, VerificationStatus};
use crate::notify::Notifier;

pub struct Verifications;

impl Resource for Verifications {
    type Item = VerificationRecord;
    const NAME: &'static str = "verifications";
    const ENDPOINTS: &'static [&'static str] = &["/api/verifications"];
}

pub struct VerificationView {
    records: FetchController<Verifications>,
    lock: ActionLock,
}

impl VerificationView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            records: FetchController::new(client, notifier),
            lock: ActionLock::new(),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.records.refresh().await
    }

    pub fn controller(&self) -> &FetchController<Verifications> {
        &self.records
    }

    pub fn items(&self) -> Arc<Vec<VerificationRecord>> {
        self.records.items()
    }

    pub fn tabs<'a>(&self, items: &'a [VerificationRecord], query: &str) -> StatusBuckets<'a, VerificationRecord> {
        StatusBuckets::partition(VERIFICATION_TABS, filter(items, query))
    }

    /// Records are keyed by SteamID, not a numeric id.
    pub async fn set_status(
        &self,
        steam_id: &str,
        status: VerificationStatus,
        reason: Option<String>,
    ) -> ActionOutcome {
        let client = self.records.client();
        let endpoint = match client.with_segment("/api/verifications", steam_id) {
            Ok(endpoint) => endpoint,
            Err(e) => return ActionOutcome::Failed(e),
        };
        let success = format!("Verification set to {}", status);
        let body = UpdateVerificationRequest { status, reason };
        run_action(
            &self.lock,
            "set_verification",
            steam_id,
            self.records.notifier(),
            Messages::new(&success, "Failed to update verification"),
            &self.records,
            client.mutate(Method::PUT, &endpoint, Some(&body)),
        )
        .await
    }
}
