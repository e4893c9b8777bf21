use futures::future::join_all;
use reqwest::{Method, StatusCode};
use std::sync::Arc;

use super::{confirm_locked, run_action, ActionOutcome, Messages};
use crate::action_lock::ActionLock;
use crate::client::{expect_ok, ApiClient};
use crate::controller::RefreshOutcome;
use crate::dialog::ConfirmDialog;
use crate::enrichment::{WhitelistBoard, WhitelistSnapshot};
use crate::error::{resolve_message, ApiError, ApiResult};
use crate::filter::{filter, StatusBuckets, WHITELIST_TABS};
use crate::models::whitelist::{
    ApplyWhitelistRequest, CreateWhitelistRequest, PlayerInfo, RejectWhitelistRequest, WhitelistEntry,
    WhitelistStatus, WhitelistStatusResponse,
};
use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub struct RejectTarget {
    pub id: i64,
    pub reason: Option<String>,
}

/// Result of a bulk approve. Individual failures do not stop the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub approved: usize,
    pub failed: usize,
}

pub struct WhitelistView {
    board: WhitelistBoard,
    lock: ActionLock,
    reject: ConfirmDialog<RejectTarget>,
    delete: ConfirmDialog<i64>,
}

impl WhitelistView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            reject: ConfirmDialog::new(notifier.clone(), "Application rejected", "Failed to reject application"),
            delete: ConfirmDialog::new(notifier.clone(), "Whitelist entry deleted", "Failed to delete entry"),
            board: WhitelistBoard::new(client, notifier),
            lock: ActionLock::new(),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.board.refresh().await
    }

    pub fn board(&self) -> &WhitelistBoard {
        &self.board
    }

    pub fn lock(&self) -> &ActionLock {
        &self.lock
    }

    pub fn snapshot(&self) -> Arc<WhitelistSnapshot> {
        self.board.snapshot()
    }

    pub fn tabs<'a>(&self, entries: &'a [WhitelistEntry], query: &str) -> StatusBuckets<'a, WhitelistEntry> {
        StatusBuckets::partition(WHITELIST_TABS, filter(entries, query))
    }

    pub async fn add(&self, steam_id: &str, name: &str) -> ActionOutcome {
        let body = CreateWhitelistRequest {
            steam_id: steam_id.to_string(),
            name: name.to_string(),
        };
        run_action(
            &self.lock,
            "add_whitelist",
            steam_id,
            self.board.notifier(),
            Messages::new("Added to whitelist", "Failed to add to whitelist"),
            &self.board,
            self.board.client().mutate(Method::POST, "/api/whitelist", Some(&body)),
        )
        .await
    }

    pub async fn approve(&self, id: i64) -> ActionOutcome {
        run_action(
            &self.lock,
            "approve",
            id,
            self.board.notifier(),
            Messages::new("Application approved", "Failed to approve application"),
            &self.board,
            approve_request(self.board.client(), id),
        )
        .await
    }

    /// Approves every pending entry of the current snapshot concurrently.
    ///
    /// Returns `None` when another action holds the lock.
    pub async fn approve_all(&self) -> Option<BatchReport> {
        let _guard = self.lock.try_acquire("approve_all", "pending")?;
        let notifier = self.board.notifier();

        let pending: Vec<i64> = self
            .board
            .snapshot()
            .entries
            .iter()
            .filter(|e| e.status == WhitelistStatus::Pending)
            .map(|e| e.id)
            .collect();

        if pending.is_empty() {
            notifier.info("No pending applications");
            return Some(BatchReport { approved: 0, failed: 0 });
        }

        let client = self.board.client();
        let results = join_all(pending.iter().map(|id| approve_request(client, *id))).await;

        let mut report = BatchReport { approved: 0, failed: 0 };
        for (id, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => report.approved += 1,
                Err(e) => {
                    tracing::warn!(id, "bulk approve failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        self.board.refresh().await;
        notifier.success(format!("{} approved", report.approved));
        if report.failed > 0 {
            notifier.error(format!("{} could not be approved", report.failed));
        }
        Some(report)
    }

    pub fn stage_reject(&self, id: i64, reason: Option<String>) -> bool {
        self.reject.stage(RejectTarget {
            id,
            reason: reason.filter(|r| !r.trim().is_empty()),
        })
    }

    pub async fn confirm_reject(&self) -> ActionOutcome {
        let client = self.board.client();
        confirm_locked(
            &self.lock,
            "reject",
            |t| t.id,
            &self.reject,
            &self.board,
            |t| async move {
                let body = RejectWhitelistRequest { reason: t.reason };
                client
                    .mutate(Method::PUT, &format!("/api/whitelist/{}/reject", t.id), Some(&body))
                    .await
            },
        )
        .await
        .into()
    }

    pub fn stage_delete(&self, id: i64) -> bool {
        self.delete.stage(id)
    }

    pub async fn confirm_delete(&self) -> ActionOutcome {
        let client = self.board.client();
        confirm_locked(
            &self.lock,
            "delete_whitelist",
            |id| *id,
            &self.delete,
            &self.board,
            |id| async move {
                client
                    .mutate::<()>(Method::DELETE, &format!("/api/whitelist/{}", id), None)
                    .await
            },
        )
        .await
        .into()
    }
}

async fn approve_request(client: &ApiClient, id: i64) -> ApiResult<()> {
    client
        .mutate::<()>(Method::PUT, &format!("/api/whitelist/{}/approve", id), None)
        .await
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Submitted,
    /// 409: an application for this SteamID already exists.
    Duplicate {
        status: Option<WhitelistStatus>,
        message: String,
    },
}

/// Public application form, no login needed.
pub async fn apply(client: &ApiClient, steam_id: &str, name: &str) -> ApiResult<ApplyOutcome> {
    let body = ApplyWhitelistRequest {
        steam_id: steam_id.to_string(),
        name: name.to_string(),
    };
    let response = client.send_json(Method::POST, "/api/whitelist/apply", &body).await?;

    if response.status() == StatusCode::CONFLICT {
        let text = response.text().await?;
        let status = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(WhitelistStatus::from));
        return Ok(ApplyOutcome::Duplicate {
            status,
            message: resolve_message(StatusCode::CONFLICT, &text),
        });
    }

    expect_ok(response).await?;
    Ok(ApplyOutcome::Submitted)
}

/// Status lookup for an applicant. 404 means no application was filed.
pub async fn application_status(client: &ApiClient, steam_id: &str) -> ApiResult<WhitelistStatusResponse> {
    let endpoint = client.with_query("/api/whitelist/status", &[("steam_id", steam_id)])?;
    client.get_json(&endpoint).await.map_err(|e| match e {
        ApiError::NotFound(_) => ApiError::NotFound("Application not found".to_string()),
        other => other,
    })
}

/// Resolves any SteamID format or profile URL to a display name.
pub async fn player_info(client: &ApiClient, steam_id: &str) -> ApiResult<PlayerInfo> {
    let endpoint = client.with_query("/api/whitelist/player-info", &[("steam_id", steam_id)])?;
    client.get_json(&endpoint).await
}
