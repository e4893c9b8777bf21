//! One module per console view. Each view owns its controller, its action lock
//! and the confirm dialogs for its destructive actions.

use std::future::Future;

use crate::action_lock::ActionLock;
use crate::controller::Refresh;
use crate::dialog::{describe_failure, ConfirmDialog, ConfirmOutcome};
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;

pub mod admin;
pub mod auth;
pub mod ban;
pub mod log;
pub mod server;
pub mod verification;
pub mod whitelist;

#[derive(Debug)]
pub enum ActionOutcome {
    Done,
    /// Refused because another action on the view is pending.
    Busy,
    /// A confirm with no staged dialog; nothing was sent.
    NothingStaged,
    Failed(ApiError),
}

impl ActionOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, ActionOutcome::Done)
    }
}

impl From<ConfirmOutcome> for ActionOutcome {
    fn from(outcome: ConfirmOutcome) -> Self {
        match outcome {
            ConfirmOutcome::Completed => ActionOutcome::Done,
            ConfirmOutcome::Failed(e) => ActionOutcome::Failed(e),
            ConfirmOutcome::NothingStaged => ActionOutcome::NothingStaged,
            ConfirmOutcome::AlreadySubmitting | ConfirmOutcome::Busy => ActionOutcome::Busy,
        }
    }
}

/// What a non-dialog mutation says on success and on failure.
pub(crate) struct Messages<'a> {
    pub success: &'a str,
    pub failure: &'a str,
    pub denied: &'a str,
}

impl<'a> Messages<'a> {
    pub fn new(success: &'a str, failure: &'a str) -> Self {
        Self {
            success,
            failure,
            denied: "Permission denied",
        }
    }
}

/// Runs one immediate mutation under the view lock, then refreshes the view.
pub(crate) async fn run_action<Fut, R>(
    lock: &ActionLock,
    operation: &str,
    id: impl std::fmt::Display,
    notifier: &Notifier,
    messages: Messages<'_>,
    view: &R,
    mutation: Fut,
) -> ActionOutcome
where
    Fut: Future<Output = ApiResult<()>>,
    R: Refresh,
{
    let Some(_guard) = lock.try_acquire(operation, id) else {
        return ActionOutcome::Busy;
    };

    match mutation.await {
        Ok(()) => {
            view.refresh().await;
            notifier.success(messages.success);
            ActionOutcome::Done
        }
        Err(e) => {
            tracing::warn!(operation, "action failed: {}", e);
            notifier.error(describe_failure(messages.failure, messages.denied, &e));
            ActionOutcome::Failed(e)
        }
    }
}

/// Confirms a staged dialog while holding the view lock for its target.
pub(crate) async fn confirm_locked<P, F, Fut, R>(
    lock: &ActionLock,
    operation: &str,
    target: impl FnOnce(&P) -> i64,
    dialog: &ConfirmDialog<P>,
    view: &R,
    mutation: F,
) -> ConfirmOutcome
where
    P: Clone,
    F: FnOnce(P) -> Fut,
    Fut: Future<Output = ApiResult<()>>,
    R: Refresh,
{
    let Some(payload) = dialog.staged() else {
        return ConfirmOutcome::NothingStaged;
    };
    let Some(_guard) = lock.try_acquire(operation, target(&payload)) else {
        return ConfirmOutcome::Busy;
    };
    dialog.confirm(mutation, view).await
}
