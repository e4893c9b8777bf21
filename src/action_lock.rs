use std::sync::{Arc, Mutex, PoisonError};

/// View-wide single-flight lock for mutating actions.
///
/// While a key such as `delete_ban:12` is held every other action on the view
/// is refused, not just the one on row 12.
#[derive(Debug, Clone, Default)]
pub struct ActionLock {
    current: Arc<Mutex<Option<String>>>,
}

/// Releases the lock when dropped, whether the action succeeded or not.
#[derive(Debug)]
pub struct ActionGuard {
    current: Arc<Mutex<Option<String>>>,
    key: String,
}

impl ActionGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() == Some(self.key.as_str()) {
            *current = None;
        }
    }
}

pub fn action_key(operation: &str, id: impl std::fmt::Display) -> String {
    format!("{}:{}", operation, id)
}

impl ActionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, operation: &str, id: impl std::fmt::Display) -> Option<ActionGuard> {
        let key = action_key(operation, id);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(busy) = current.as_deref() {
            tracing::debug!(requested = %key, busy, "action refused, another one is pending");
            return None;
        }
        *current = Some(key.clone());
        Some(ActionGuard {
            current: self.current.clone(),
            key,
        })
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.current().is_some()
    }

    /// Whether the row-level button for `operation` on `id` shows a spinner.
    pub fn is_pending(&self, operation: &str, id: impl std::fmt::Display) -> bool {
        self.current().as_deref() == Some(action_key(operation, id).as_str())
    }
}
