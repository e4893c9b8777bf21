//! Fetch-state controller shared by every list view.
//!
//! A controller owns the cached list of one resource, a loading flag and the
//! last error. It is refreshed once when a view opens and again after every
//! successful mutation; there is no polling.

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;

/// An entity type and the endpoints that list it.
pub trait Resource: Send + Sync + 'static {
    type Item: DeserializeOwned + Clone + Send + Sync + 'static;

    /// Used in notifications and logs.
    const NAME: &'static str;

    /// All list calls; their results are concatenated in this order.
    const ENDPOINTS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh already settled; this response was dropped.
    Stale,
    Failed,
    /// A cooldown held the request back; nothing was sent.
    Skipped,
}

/// Anything a dialog can ask to reload after a mutation.
pub trait Refresh {
    fn refresh(&self) -> impl Future<Output = RefreshOutcome> + Send;
}

struct FetchState<T> {
    items: Arc<Vec<T>>,
    error: Option<String>,
    applied: u64,
    loaded: bool,
}

pub struct FetchController<R: Resource> {
    client: ApiClient,
    notifier: Notifier,
    state: Mutex<FetchState<R::Item>>,
    in_flight: AtomicUsize,
    issued: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a loading counter up while a request is outstanding, even if its
/// future is dropped half way.
pub(crate) struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    pub(crate) fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<R: Resource> FetchController<R> {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            client,
            notifier,
            state: Mutex::new(FetchState {
                items: Arc::new(Vec::new()),
                error: None,
                applied: 0,
                loaded: false,
            }),
            in_flight: AtomicUsize::new(0),
            issued: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Current snapshot. Cheap to clone; never partially updated.
    pub fn items(&self) -> Arc<Vec<R::Item>> {
        lock(&self.state).items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// True once any refresh has succeeded.
    pub fn is_loaded(&self) -> bool {
        lock(&self.state).loaded
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = InFlight::enter(&self.in_flight);

        let result = self.fetch_all().await;
        self.settle(ticket, result)
    }

    async fn fetch_all(&self) -> ApiResult<Vec<R::Item>> {
        let calls = R::ENDPOINTS
            .iter()
            .map(|endpoint| self.client.get_json::<Vec<R::Item>>(endpoint));
        let pages = try_join_all(calls).await?;
        Ok(pages.into_iter().flatten().collect())
    }

    fn settle(&self, ticket: u64, result: ApiResult<Vec<R::Item>>) -> RefreshOutcome {
        let mut state = lock(&self.state);

        if ticket < state.applied {
            tracing::debug!(resource = R::NAME, ticket, applied = state.applied, "dropping stale response");
            return RefreshOutcome::Stale;
        }
        state.applied = ticket;

        match result {
            Ok(items) => {
                tracing::debug!(resource = R::NAME, count = items.len(), "cache replaced");
                state.items = Arc::new(items);
                state.error = None;
                state.loaded = true;
                RefreshOutcome::Applied
            }
            Err(e) => {
                // Last known good data stays visible.
                let message = load_failure_message(R::NAME, &e);
                tracing::error!(resource = R::NAME, "Failed to refresh: {}", e);
                state.error = Some(message.clone());
                drop(state);
                self.notifier.error(message);
                RefreshOutcome::Failed
            }
        }
    }
}

impl<R: Resource> Refresh for FetchController<R> {
    fn refresh(&self) -> impl Future<Output = RefreshOutcome> + Send {
        FetchController::refresh(self)
    }
}

pub fn load_failure_message(name: &str, error: &ApiError) -> String {
    match error {
        ApiError::Forbidden(_) => format!("Permission denied: you cannot view {}", name),
        ApiError::Network(_) => format!("Network error while fetching {}", name),
        other => format!("Failed to fetch {}: {}", name, other.detail()),
    }
}
