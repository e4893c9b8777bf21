//! Whitelist review board: whitelist entries joined with local and global bans.
//!
//! Sources are loaded with settle-all semantics. A source that fails simply
//! contributes nothing; the board only keeps its previous snapshot when every
//! source failed.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::ApiClient;
use crate::controller::{InFlight, Refresh, RefreshOutcome};
use crate::error::ApiResult;
use crate::models::ban::{Ban, BulkGlobalBanRequest, GlobalBan, GlobalBanMap};
use crate::models::present;
use crate::models::whitelist::WhitelistEntry;
use crate::notify::Notifier;

/// The three SteamID spellings a record may carry.
#[derive(Debug, Clone, Copy)]
pub struct SteamIds<'a> {
    pub steam_id: Option<&'a str>,
    pub steam_id_64: Option<&'a str>,
    pub steam_id_3: Option<&'a str>,
}

pub trait HasSteamIds {
    fn steam_ids(&self) -> SteamIds<'_>;
}

impl HasSteamIds for WhitelistEntry {
    fn steam_ids(&self) -> SteamIds<'_> {
        SteamIds {
            steam_id: Some(self.steam_id.as_str()),
            steam_id_64: self.steam_id_64.as_deref(),
            steam_id_3: self.steam_id_3.as_deref(),
        }
    }
}

impl HasSteamIds for Ban {
    fn steam_ids(&self) -> SteamIds<'_> {
        SteamIds {
            steam_id: Some(self.steam_id.as_str()),
            steam_id_64: self.steam_id_64.as_deref(),
            steam_id_3: self.steam_id_3.as_deref(),
        }
    }
}

fn same_id(a: Option<&str>, b: Option<&str>) -> bool {
    match (present(a), present(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// True when at least one format is present on both sides and equal.
/// Two absent ids never match.
pub fn same_player(a: &impl HasSteamIds, b: &impl HasSteamIds) -> bool {
    let (a, b) = (a.steam_ids(), b.steam_ids());
    same_id(a.steam_id, b.steam_id)
        || same_id(a.steam_id_64, b.steam_id_64)
        || same_id(a.steam_id_3, b.steam_id_3)
}

#[derive(Debug, Clone)]
pub struct AnnotatedEntry<'a> {
    pub entry: &'a WhitelistEntry,
    pub local_ban: Option<&'a Ban>,
    pub global_ban: Option<&'a GlobalBan>,
}

impl AnnotatedEntry<'_> {
    pub fn is_flagged(&self) -> bool {
        self.local_ban.is_some() || self.global_ban.is_some()
    }
}

/// Borrows from the sources; nothing is copied or modified.
pub fn annotate<'a>(
    entries: &'a [WhitelistEntry],
    bans: &'a [Ban],
    global_bans: &'a GlobalBanMap,
) -> Vec<AnnotatedEntry<'a>> {
    entries
        .iter()
        .map(|entry| AnnotatedEntry {
            entry,
            local_ban: bans
                .iter()
                .filter(|ban| ban.is_active())
                .find(|ban| same_player(entry, *ban)),
            global_ban: present(entry.steam_id_64.as_deref()).and_then(|id| global_bans.get(id)),
        })
        .collect()
}

/// Distinct 64-bit ids, sorted so the bulk request is deterministic.
pub fn distinct_steam_id_64s(entries: &[WhitelistEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| present(e.steam_id_64.as_deref()))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Bulk lookup answers map each id to a ban payload, or to null/false when
/// the player is clean.
pub fn parse_global_bans(raw: HashMap<String, Value>) -> GlobalBanMap {
    raw.into_iter()
        .filter_map(|(id, value)| match value {
            Value::Object(_) => match serde_json::from_value::<GlobalBan>(value) {
                Ok(ban) => Some((id, ban)),
                Err(e) => {
                    tracing::warn!(steam_id_64 = %id, "unreadable global ban payload: {}", e);
                    None
                }
            },
            Value::Bool(true) => Some((
                id,
                GlobalBan {
                    reason: None,
                    ban_type: None,
                    source: None,
                    extra: serde_json::Map::new(),
                },
            )),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct WhitelistSnapshot {
    /// pending, approved, rejected, in that order
    pub entries: Vec<WhitelistEntry>,
    /// Per-bucket copy of `entries`, carried forward when a bucket fails.
    buckets: [Vec<WhitelistEntry>; 3],
    pub bans: Vec<Ban>,
    pub global_bans: GlobalBanMap,
    /// Sources that did not load on the last refresh.
    pub failed_sources: Vec<&'static str>,
}

impl WhitelistSnapshot {
    pub fn annotated(&self) -> Vec<AnnotatedEntry<'_>> {
        annotate(&self.entries, &self.bans, &self.global_bans)
    }
}

struct BoardState {
    snapshot: Arc<WhitelistSnapshot>,
    applied: u64,
}

pub struct WhitelistBoard {
    client: ApiClient,
    notifier: Notifier,
    state: Mutex<BoardState>,
    in_flight: AtomicUsize,
    issued: AtomicU64,
}

const WHITELIST_SOURCES: [(&str, &str); 3] = [
    ("pending applications", "/api/whitelist/pending"),
    ("approved whitelist", "/api/whitelist"),
    ("rejected applications", "/api/whitelist/rejected"),
];

impl WhitelistBoard {
    pub fn new(client: ApiClient, notifier: Notifier) -> Self {
        Self {
            client,
            notifier,
            state: Mutex::new(BoardState {
                snapshot: Arc::new(WhitelistSnapshot::default()),
                applied: 0,
            }),
            in_flight: AtomicUsize::new(0),
            issued: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn snapshot(&self) -> Arc<WhitelistSnapshot> {
        self.lock().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = InFlight::enter(&self.in_flight);

        let previous = self.snapshot();
        let snapshot = self.load(&previous).await;
        let everything_failed = snapshot.failed_sources.len() >= WHITELIST_SOURCES.len() + 1;

        if !snapshot.failed_sources.is_empty() {
            self.notifier.error(format!(
                "Could not load: {}",
                snapshot.failed_sources.join(", ")
            ));
        }

        let mut state = self.lock();
        if ticket < state.applied {
            tracing::debug!(ticket, applied = state.applied, "dropping stale whitelist board");
            return RefreshOutcome::Stale;
        }
        state.applied = ticket;

        if everything_failed {
            return RefreshOutcome::Failed;
        }
        state.snapshot = Arc::new(snapshot);
        RefreshOutcome::Applied
    }

    /// Failed sources keep what `previous` had for them.
    async fn load(&self, previous: &WhitelistSnapshot) -> WhitelistSnapshot {
        let [(pending_name, pending_ep), (approved_name, approved_ep), (rejected_name, rejected_ep)] =
            WHITELIST_SOURCES;

        let (pending, approved, rejected, bans) = futures::join!(
            self.client.get_json::<Vec<WhitelistEntry>>(pending_ep),
            self.client.get_json::<Vec<WhitelistEntry>>(approved_ep),
            self.client.get_json::<Vec<WhitelistEntry>>(rejected_ep),
            self.client.get_json::<Vec<Ban>>("/api/bans"),
        );

        let mut snapshot = WhitelistSnapshot::default();
        let results = [
            (pending_name, pending),
            (approved_name, approved),
            (rejected_name, rejected),
        ];
        for (slot, (name, result)) in results.into_iter().enumerate() {
            snapshot.buckets[slot] = match result {
                Ok(list) => list,
                Err(e) => {
                    tracing::warn!(source = name, "whitelist source failed: {}", e);
                    snapshot.failed_sources.push(name);
                    previous.buckets[slot].clone()
                }
            };
        }
        snapshot.entries = snapshot.buckets.concat();

        match bans {
            Ok(list) => snapshot.bans = list,
            Err(e) => {
                tracing::warn!("ban list failed: {}", e);
                snapshot.failed_sources.push("bans");
                snapshot.bans = previous.bans.clone();
            }
        }

        let ids = distinct_steam_id_64s(&snapshot.entries);
        if !ids.is_empty() {
            match self.lookup_global_bans(ids).await {
                Ok(map) => snapshot.global_bans = map,
                Err(e) => {
                    tracing::warn!("global ban lookup failed: {}", e);
                    snapshot.failed_sources.push("global bans");
                    snapshot.global_bans = previous.global_bans.clone();
                }
            }
        }

        snapshot
    }

    /// One POST for all ids.
    async fn lookup_global_bans(&self, steam_ids: Vec<String>) -> ApiResult<GlobalBanMap> {
        let raw: HashMap<String, Value> = self
            .client
            .mutate_json(
                reqwest::Method::POST,
                "/api/check_global_ban/bulk",
                &BulkGlobalBanRequest { steam_ids },
            )
            .await?;
        Ok(parse_global_bans(raw))
    }
}

impl Refresh for WhitelistBoard {
    fn refresh(&self) -> impl Future<Output = RefreshOutcome> + Send {
        WhitelistBoard::refresh(self)
    }
}
