use std::sync::Arc;

use crate::client::ApiClient;
use crate::controller::{FetchController, RefreshOutcome, Resource};
use crate::filter::filter;
use crate::models::log::AuditLog;
use crate::notify::Notifier;

pub struct AuditLogs;

impl Resource for AuditLogs {
    type Item = AuditLog;
    const NAME: &'static str = "audit logs";
    const ENDPOINTS: &'static [&'static str] = &["/api/logs"];
}

/// Read-only audit trail.
pub struct LogView {
    logs: FetchController<AuditLogs>,
}

impl LogView {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            logs: FetchController::new(client, notifier),
        }
    }

    pub async fn open(&self) -> RefreshOutcome {
        self.logs.refresh().await
    }

    pub fn controller(&self) -> &FetchController<AuditLogs> {
        &self.logs
    }

    pub fn items(&self) -> Arc<Vec<AuditLog>> {
        self.logs.items()
    }

    pub fn search<'a>(&self, items: &'a [AuditLog], query: &str) -> Vec<&'a AuditLog> {
        filter(items, query)
    }
}
