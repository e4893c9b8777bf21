mod common;

use common::{ban_json, notifier, whitelist_json, MockBackend, ADMIN_TOKEN, SUPER_TOKEN};
use kzguard_console::controller::RefreshOutcome;
use kzguard_console::error::ApiError;
use kzguard_console::handlers::ban::{BanView, DELETE_DENIED};
use kzguard_console::handlers::server::{CommunityView, ManualRefresh};
use kzguard_console::handlers::whitelist::{application_status, apply, ApplyOutcome, BatchReport, WhitelistView};
use kzguard_console::handlers::ActionOutcome;
use kzguard_console::models::ban::{BanStatus, BanType, CreateBanRequest};
use kzguard_console::models::server::CreateServerRequest;
use kzguard_console::models::whitelist::WhitelistStatus;
use kzguard_console::notify::{drain, Level};
use serde_json::json;

#[tokio::test]
async fn forbidden_delete_leaves_the_ban_in_place() {
    let backend = MockBackend::start().await;
    backend.state().bans = vec![ban_json(12, "STEAM_0:1:12", "active")];

    let (notifier, mut rx) = notifier();
    let view = BanView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    assert_eq!(view.open().await, RefreshOutcome::Applied);

    assert!(view.stage_delete(12));
    let outcome = view.confirm_delete().await;
    assert!(matches!(outcome, ActionOutcome::Failed(ApiError::Forbidden(_))));

    assert_eq!(view.items().len(), 1);
    assert_eq!(view.items()[0].id, 12);
    assert_eq!(view.delete_dialog().staged(), Some(12));
    assert!(!view.lock().is_busy());

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, Level::Error);
    assert_eq!(notes[0].message, DELETE_DENIED);
    assert_eq!(backend.state().bans.len(), 1);
}

#[tokio::test]
async fn super_admin_delete_refreshes_the_list() {
    let backend = MockBackend::start().await;
    backend.state().bans = vec![ban_json(12, "STEAM_0:1:12", "active"), ban_json(13, "STEAM_0:1:13", "active")];

    let (notifier, mut rx) = notifier();
    let view = BanView::new(backend.client(Some(SUPER_TOKEN)), notifier);
    view.open().await;
    view.stage_delete(12);

    assert!(view.confirm_delete().await.is_done());
    assert_eq!(view.items().iter().map(|b| b.id).collect::<Vec<_>>(), vec![13]);
    assert!(!view.delete_dialog().is_open());

    let notes = drain(&mut rx);
    assert_eq!(notes.last().map(|n| n.message.as_str()), Some("Ban deleted"));
    // mutation, then exactly one refresh after the initial load
    assert_eq!(backend.requests_to("GET", "/api/bans").len(), 2);
}

#[tokio::test]
async fn new_permanent_ban_then_unban() {
    let backend = MockBackend::start().await;
    let (notifier, mut rx) = notifier();
    let view = BanView::new(backend.client(Some(SUPER_TOKEN)), notifier);
    view.open().await;

    let outcome = view
        .create(CreateBanRequest {
            name: "Cheater".to_string(),
            steam_id: "STEAM_0:1:123".to_string(),
            ip: String::new(),
            ban_type: BanType::Account,
            reason: Some("aimbot".to_string()),
            duration: 0,
            admin_name: Some("root".to_string()),
        })
        .await;
    assert!(outcome.is_done());

    let items = view.items();
    assert_eq!(items.len(), 1);
    let ban = &items[0];
    assert_eq!(ban.status, BanStatus::Active);
    assert!(ban.expires_at.is_none());
    assert!(ban.is_permanent());

    let posted = backend.requests_to("POST", "/api/bans");
    assert_eq!(posted.len(), 1);

    assert!(view.lift(ban.id).await.is_done());
    let items = view.items();
    assert_eq!(items[0].status, BanStatus::Expired);
    let tabs = view.tabs(&items, "");
    assert_eq!(tabs.count("active"), 0);
    assert_eq!(tabs.count("expired"), 1);

    let messages: Vec<String> = drain(&mut rx).into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Ban created".to_string(), "Ban lifted".to_string()]);
}

#[tokio::test]
async fn failed_refresh_keeps_the_last_good_list() {
    let backend = MockBackend::start().await;
    backend.state().bans = vec![ban_json(1, "STEAM_0:0:1", "active")];

    let (notifier, mut rx) = notifier();
    let view = BanView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    assert_eq!(view.open().await, RefreshOutcome::Applied);

    backend.state().fail_ban_list = true;
    assert_eq!(view.open().await, RefreshOutcome::Failed);

    assert_eq!(view.items().len(), 1);
    assert!(!view.controller().is_loading());
    assert_eq!(
        view.controller().error().as_deref(),
        Some("Failed to fetch bans: ban table locked")
    );
    assert_eq!(drain(&mut rx).len(), 1);
}

fn seed_pending(backend: &MockBackend) {
    backend.state().whitelist = vec![
        whitelist_json(1, "STEAM_0:1:1", "76561198000000003", "pending"),
        whitelist_json(2, "STEAM_0:1:2", "76561198000000005", "pending"),
        whitelist_json(3, "STEAM_0:1:3", "76561198000000007", "pending"),
    ];
}

#[tokio::test]
async fn approve_all_reports_partial_success() {
    let backend = MockBackend::start().await;
    seed_pending(&backend);
    backend.state().fail_approve.insert(2);

    let (notifier, mut rx) = notifier();
    let view = WhitelistView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    view.open().await;
    drain(&mut rx);

    let report = view.approve_all().await.unwrap();
    assert_eq!(report, BatchReport { approved: 2, failed: 1 });

    let approve_calls = backend
        .state()
        .requests
        .iter()
        .filter(|r| r.method == "PUT" && r.path.ends_with("/approve"))
        .count();
    assert_eq!(approve_calls, 3);

    let notes = drain(&mut rx);
    assert!(notes.iter().any(|n| n.level == Level::Success && n.message == "2 approved"));

    let snapshot = view.snapshot();
    let status_of = |id: i64| {
        snapshot
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status.clone())
    };
    assert_eq!(status_of(1), Some(WhitelistStatus::Approved));
    assert_eq!(status_of(2), Some(WhitelistStatus::Pending));
    assert_eq!(status_of(3), Some(WhitelistStatus::Approved));
    assert!(!view.lock().is_busy());
}

#[tokio::test]
async fn global_lookup_failure_still_shows_local_bans() {
    let backend = MockBackend::start().await;
    {
        let mut state = backend.state();
        state.whitelist = vec![
            whitelist_json(1, "STEAM_0:1:100", "76561198000000201", "pending"),
            whitelist_json(2, "STEAM_0:1:101", "76561198000000203", "approved"),
            // same account filed twice
            whitelist_json(3, "STEAM_0:1:100", "76561198000000201", "rejected"),
        ];
        state.bans = vec![
            ban_json(50, "STEAM_0:1:100", "active"),
            ban_json(51, "STEAM_0:1:101", "expired"),
        ];
        state.fail_global_lookup = true;
    }

    let (notifier, mut rx) = notifier();
    let view = WhitelistView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    assert_eq!(view.open().await, RefreshOutcome::Applied);

    let snapshot = view.snapshot();
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.failed_sources, vec!["global bans"]);

    let annotated = snapshot.annotated();
    let local: Vec<Option<i64>> = annotated.iter().map(|a| a.local_ban.map(|b| b.id)).collect();
    assert_eq!(local, vec![Some(50), None, Some(50)]);
    assert!(annotated.iter().all(|a| a.global_ban.is_none()));

    // one batched lookup with each id once
    let bodies = backend.state().bulk_bodies.clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({ "steam_ids": ["76561198000000201", "76561198000000203"] })
    );

    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("global bans"));
}

#[tokio::test]
async fn global_bans_are_joined_by_steam_id_64() {
    let backend = MockBackend::start().await;
    seed_pending(&backend);
    backend.state().global_bans.insert(
        "76561198000000005".to_string(),
        json!({ "reason": "bhop hack", "ban_type": "global" }),
    );

    let (notifier, _rx) = notifier();
    let view = WhitelistView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    view.open().await;

    let snapshot = view.snapshot();
    let flagged: Vec<i64> = snapshot
        .annotated()
        .iter()
        .filter(|a| a.global_ban.is_some())
        .map(|a| a.entry.id)
        .collect();
    assert_eq!(flagged, vec![2]);
    assert_eq!(snapshot.global_bans.len(), 1);
}

#[tokio::test]
async fn one_failed_bucket_does_not_hide_the_others() {
    let backend = MockBackend::start().await;
    {
        let mut state = backend.state();
        state.whitelist = vec![
            whitelist_json(1, "STEAM_0:1:1", "76561198000000003", "pending"),
            whitelist_json(2, "STEAM_0:1:2", "76561198000000005", "approved"),
        ];
        state.fail_pending_list = true;
    }

    let (notifier, _rx) = notifier();
    let view = WhitelistView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    assert_eq!(view.open().await, RefreshOutcome::Applied);

    let snapshot = view.snapshot();
    assert_eq!(snapshot.entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2]);
    assert_eq!(snapshot.failed_sources, vec!["pending applications"]);
}

#[tokio::test]
async fn failed_rcon_check_saves_nothing() {
    let backend = MockBackend::start().await;
    let (notifier, mut rx) = notifier();
    let view = CommunityView::new(backend.client(Some(SUPER_TOKEN)), notifier);

    let mut request = CreateServerRequest::blank(1);
    request.name = "KZ #1".to_string();
    request.ip = "10.0.0.2".to_string();
    request.rcon_password = "wrong".to_string();

    let outcome = view.create_server(request.clone()).await;
    assert!(matches!(outcome, ActionOutcome::Failed(_)));
    assert!(backend.requests_to("POST", "/api/servers").is_empty());
    assert_eq!(
        drain(&mut rx)[0].message,
        "RCON check failed: RCON authentication failed"
    );

    request.rcon_password = "hunter2".to_string();
    assert!(view.create_server(request).await.is_done());
    assert_eq!(backend.state().servers.len(), 1);
    assert_eq!(backend.state().servers[0]["rcon_password"], "hunter2");
}

#[tokio::test]
async fn player_fetch_failure_clears_the_list() {
    let backend = MockBackend::start().await;
    backend.state().players = vec![json!({
        "userid": 7, "name": "runner", "steam_id": "STEAM_0:1:7", "time": "12:01", "ping": 40
    })];

    let (notifier, mut rx) = notifier();
    let view = CommunityView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    let panel = view.players();

    assert_eq!(panel.open(1).await, RefreshOutcome::Applied);
    assert_eq!(panel.players().len(), 1);

    assert_eq!(panel.open(99).await, RefreshOutcome::Failed);
    assert!(panel.players().is_empty());
    assert_eq!(drain(&mut rx)[0].message, "Failed to fetch players: RCON timeout");
}

#[tokio::test]
async fn public_application_flow() {
    let backend = MockBackend::start().await;
    let client = backend.client(None);

    assert_eq!(
        apply(&client, "STEAM_0:1:42", "newbie").await.unwrap(),
        ApplyOutcome::Submitted
    );
    match apply(&client, "STEAM_0:1:42", "newbie").await.unwrap() {
        ApplyOutcome::Duplicate { status, message } => {
            assert_eq!(status, Some(WhitelistStatus::Pending));
            assert_eq!(message, "Application already exists");
        }
        other => panic!("expected a duplicate, got {other:?}"),
    }

    let status = application_status(&client, "STEAM_0:1:42").await.unwrap();
    assert_eq!(status.status, WhitelistStatus::Pending);

    let err = application_status(&client, "STEAM_0:1:404").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref m) if m == "Application not found"));

    let lookups = backend.requests_to("GET", "/api/whitelist/status");
    assert_eq!(lookups[0].query.as_deref(), Some("steam_id=STEAM_0%3A1%3A42"));
}

#[tokio::test]
async fn failed_bucket_keeps_its_last_good_entries() {
    let backend = MockBackend::start().await;
    {
        let mut state = backend.state();
        state.whitelist = vec![
            whitelist_json(1, "STEAM_0:1:1", "76561198000000003", "pending"),
            whitelist_json(2, "STEAM_0:1:2", "76561198000000005", "approved"),
        ];
        state.bans = vec![ban_json(40, "STEAM_0:1:1", "active")];
    }

    let (notifier, mut rx) = notifier();
    let view = WhitelistView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    assert_eq!(view.open().await, RefreshOutcome::Applied);
    let ids = |view: &WhitelistView| view.snapshot().entries.iter().map(|e| e.id).collect::<Vec<_>>();
    assert_eq!(ids(&view), vec![1, 2]);
    drain(&mut rx);

    {
        let mut state = backend.state();
        state.fail_pending_list = true;
        state.fail_ban_list = true;
    }
    assert_eq!(view.open().await, RefreshOutcome::Applied);

    let snapshot = view.snapshot();
    assert_eq!(ids(&view), vec![1, 2]);
    assert_eq!(snapshot.failed_sources, vec!["pending applications", "bans"]);
    assert_eq!(snapshot.annotated()[0].local_ban.map(|b| b.id), Some(40));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn every_player_fetch_shares_the_cooldown() {
    let backend = MockBackend::start().await;
    backend.state().players = vec![json!({
        "userid": 7, "name": "runner", "steam_id": "STEAM_0:1:7", "time": "12:01", "ping": 40
    })];

    let (notifier, _rx) = notifier();
    let view = CommunityView::new(backend.client(Some(ADMIN_TOKEN)), notifier);
    let panel = view.players();

    assert_eq!(panel.open(1).await, RefreshOutcome::Applied);
    assert!(matches!(
        panel.manual_refresh().await,
        ManualRefresh::CoolingDown { remaining_secs } if remaining_secs > 0
    ));
    assert_eq!(panel.open(1).await, RefreshOutcome::Skipped);

    // the reload after a kick is held back as well
    assert!(view.stage_kick(7));
    assert!(view.confirm_kick().await.is_done());
    assert_eq!(backend.requests_to("POST", "/api/servers/1/kick").len(), 1);

    assert_eq!(backend.requests_to("GET", "/api/servers/1/players").len(), 1);
    assert_eq!(panel.players().len(), 1);
    assert!(!panel.is_loading());
}

#[tokio::test]
async fn pending_action_refuses_every_other_action_on_the_view() {
    let backend = MockBackend::start().await;
    backend.state().bans = vec![ban_json(12, "STEAM_0:1:12", "active")];

    let (notifier, mut rx) = notifier();
    let view = BanView::new(backend.client(Some(SUPER_TOKEN)), notifier);
    view.open().await;
    let before = backend.state().requests.len();

    let held = view.lock().try_acquire("update_ban", 12).unwrap();
    assert!(view.lock().is_busy());

    assert!(matches!(view.lift(12).await, ActionOutcome::Busy));
    view.stage_delete(12);
    assert!(matches!(view.confirm_delete().await, ActionOutcome::Busy));
    let create = CreateBanRequest {
        name: "Cheater".to_string(),
        steam_id: "STEAM_0:1:99".to_string(),
        ip: String::new(),
        ban_type: BanType::Account,
        reason: None,
        duration: 60,
        admin_name: None,
    };
    assert!(matches!(view.create(create).await, ActionOutcome::Busy));

    assert_eq!(backend.state().requests.len(), before);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(view.delete_dialog().staged(), Some(12));

    drop(held);
    assert!(view.confirm_delete().await.is_done());
    assert!(view.items().is_empty());
}
