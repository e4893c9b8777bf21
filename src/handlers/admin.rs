use reqwest::Method;
use std::sync::Arc;

use super::{confirm_locked, run_action, ActionOutcome, Messages};
use crate::action_lock::ActionLock;
use crate::client::ApiClient;
use crate::controller::{FetchController, RefreshOutcome, Resource};
use crate::dialog::ConfirmDialog;
use crate::filter::filter;
use crate::models::user::{AdminAccount, CreateAdminRequest, UpdateAdminRequest};
use crate::notify::Notifier;

pub struct Admins;

impl Resource for Admins {
    type Item = AdminAccount;
    const NAME: &'static str = "admins";
    const ENDPOINTS: &'static [&'static str] = &["/api/admins"];
}

/// Admin accounts. Role changes and removing other admins are checked by the
/// backend; the console only words the 403.
pub struct AdminView {
    admins: FetchController<Admins>,
    lock: ActionLock,
    deactivate: ConfirmDialog<i64>,
}

const ADMIN_DENIED: &str = "Permission denied: only super admins can manage other admins";

impl AdminView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            deactivate: ConfirmDialog::new(notifier.clone(), "Admin removed", "Failed to remove admin")
                .denied(ADMIN_DENIED),
            admins: FetchController::new(client, notifier),
            lock: ActionLock::new(),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.admins.refresh().await
    }

    pub fn controller(&self) -> &FetchController<Admins> {
        &self.admins
    }

    pub fn items(&self) -> Arc<Vec<AdminAccount>> {
        self.admins.items()
    }

    pub fn search<'a>(&self, items: &'a [AdminAccount], query: &str) -> Vec<&'a AdminAccount> {
        filter(items, query)
    }

    pub async fn create(&self, request: CreateAdminRequest) -> ActionOutcome {
        let client = self.admins.client();
        run_action(
            &self.lock,
            "create_admin",
            &request.username,
            self.admins.notifier(),
            Messages {
                denied: ADMIN_DENIED,
                ..Messages::new("Admin created", "Failed to create admin")
            },
            &self.admins,
            client.mutate(Method::POST, "/api/admins", Some(&request)),
        )
        .await
    }

    pub async fn update(&self, id: i64, request: UpdateAdminRequest) -> ActionOutcome {
        let client = self.admins.client();
        let endpoint = format!("/api/admins/{}", id);
        run_action(
            &self.lock,
            "update_admin",
            id,
            self.admins.notifier(),
            Messages {
                denied: ADMIN_DENIED,
                ..Messages::new("Admin updated", "Failed to update admin")
            },
            &self.admins,
            client.mutate(Method::PUT, &endpoint, Some(&request)),
        )
        .await
    }

    pub fn stage_deactivate(&self, id: i64) -> bool {
        self.deactivate.stage(id)
    }

    pub fn deactivate_dialog(&self) -> &ConfirmDialog<i64> {
        &self.deactivate
    }

    pub async fn confirm_deactivate(&self) -> ActionOutcome {
        let client = self.admins.client();
        confirm_locked(
            &self.lock,
            "deactivate_admin",
            |id| *id,
            &self.deactivate,
            &self.admins,
            |id| async move {
                client
                    .mutate::<()>(Method::DELETE, &format!("/api/admins/{}", id), None)
                    .await
            },
        )
        .await
        .into()
    }
}
