use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::controller::Refresh;
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState<P> {
    Closed,
    Staged(P),
    Submitting(P),
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Completed,
    /// The dialog is staged again so the user can retry or cancel.
    Failed(ApiError),
    NothingStaged,
    AlreadySubmitting,
    /// Another action on the same view holds the lock.
    Busy,
}

impl ConfirmOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ConfirmOutcome::Completed)
    }
}

/// Two-step confirm for one mutation.
///
/// `stage` only records what the action targets; nothing reaches the backend
/// until `confirm`. On success the dialog closes, the owning view refreshes
/// and a success toast goes out. On failure the payload is staged again and
/// an error toast goes out, with 403 worded separately.
pub struct ConfirmDialog<P> {
    state: Mutex<DialogState<P>>,
    notifier: Notifier,
    success: String,
    failure: String,
    denied: String,
}

impl<P: Clone> ConfirmDialog<P> {
    pub fn new(notifier: Notifier, success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(DialogState::Closed),
            notifier,
            success: success.into(),
            failure: failure.into(),
            denied: "Permission denied".to_string(),
        }
    }

    /// Message shown on 403 instead of the generic failure.
    pub fn denied(mut self, message: impl Into<String>) -> Self {
        self.denied = message.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, DialogState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> DialogState<P> {
        self.lock().clone()
    }

    pub fn staged(&self) -> Option<P> {
        match &*self.lock() {
            DialogState::Staged(p) | DialogState::Submitting(p) => Some(p.clone()),
            DialogState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(*self.lock(), DialogState::Closed)
    }

    /// Opens the dialog for `payload`. Refused while a submit is running.
    pub fn stage(&self, payload: P) -> bool {
        let mut state = self.lock();
        if matches!(*state, DialogState::Submitting(_)) {
            return false;
        }
        *state = DialogState::Staged(payload);
        true
    }

    pub fn cancel(&self) {
        let mut state = self.lock();
        if matches!(*state, DialogState::Staged(_)) {
            *state = DialogState::Closed;
        }
    }

    pub async fn confirm<F, Fut, R>(&self, mutation: F, view: &R) -> ConfirmOutcome
    where
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
        R: Refresh,
    {
        let payload = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, DialogState::Closed) {
                DialogState::Staged(p) => {
                    *state = DialogState::Submitting(p.clone());
                    p
                }
                DialogState::Submitting(p) => {
                    *state = DialogState::Submitting(p);
                    return ConfirmOutcome::AlreadySubmitting;
                }
                DialogState::Closed => return ConfirmOutcome::NothingStaged,
            }
        };

        let mut submit = SubmitGuard {
            dialog: self,
            payload: Some(payload.clone()),
        };

        match mutation(payload).await {
            Ok(()) => {
                submit.payload = None;
                *self.lock() = DialogState::Closed;
                view.refresh().await;
                self.notifier.success(self.success.clone());
                ConfirmOutcome::Completed
            }
            Err(e) => {
                // guard drop puts the payload back to Staged
                drop(submit);
                self.notifier.error(self.failure_message(&e));
                ConfirmOutcome::Failed(e)
            }
        }
    }

    pub fn failure_message(&self, error: &ApiError) -> String {
        describe_failure(&self.failure, &self.denied, error)
    }
}

/// Toast text for a failed mutation. 403 gets its own wording.
pub fn describe_failure(failure: &str, denied: &str, error: &ApiError) -> String {
    match error {
        ApiError::Forbidden(_) => denied.to_string(),
        ApiError::Network(_) => format!("{}: network error", failure),
        other => format!("{}: {}", failure, other.detail()),
    }
}

/// Returns a dialog stuck in `Submitting` to `Staged` if the submit did not
/// finish, including when the confirm future is dropped.
struct SubmitGuard<'a, P: Clone> {
    dialog: &'a ConfirmDialog<P>,
    payload: Option<P>,
}

impl<P: Clone> Drop for SubmitGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(p) = self.payload.take() {
            let mut state = self.dialog.lock();
            if matches!(*state, DialogState::Submitting(_)) {
                *state = DialogState::Staged(p);
            }
        }
    }
}
