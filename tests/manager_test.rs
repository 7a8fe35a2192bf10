// Integration tests for the AchievementsManager: callbacks, notices, gating and shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    AddressMemory, FakeEngine, FixedTransport, RecordingListener, RecordingNotices, RecordingStore,
};
use ra_session_engine::dispatch::events::AchievementEvent;
use ra_session_engine::dispatch::notice::Notice;
use ra_session_engine::dispatch::ui::UiContext;
use ra_session_engine::engine::manager::AchievementsManager;
use ra_session_engine::engine::traits::{
    DataToken, EngineCallbacks, GameSummary, ServerCall, TargetToken,
};
use tokio::runtime::Handle;

struct Harness {
    engine: Arc<FakeEngine>,
    manager: Arc<AchievementsManager>,
    notices: Arc<RecordingNotices>,
    listener: Arc<RecordingListener>,
    ui: UiContext,
}

fn harness(status: Option<u16>) -> Harness {
    let (ui, _join) = UiContext::spawn(&Handle::current());
    let engine = FakeEngine::new();
    let manager = Arc::new(AchievementsManager::new(
        engine.clone(),
        Arc::new(FixedTransport { status }),
        ui.clone(),
    ));
    let notices = Arc::new(RecordingNotices::default());
    let listener = Arc::new(RecordingListener::default());
    manager.set_notice_sink(notices.clone());
    manager.set_event_listener(listener.clone());
    Harness {
        engine,
        manager,
        notices,
        listener,
        ui,
    }
}

impl Harness {
    fn start(&self) -> u64 {
        assert!(self.manager.start_session("/roms/sm64.z64"));
        self.engine.request_id()
    }

    fn activate(&self) {
        let id = self.start();
        self.manager.login_result(id, true, None);
        self.manager.game_load_result(id, true, None);
        assert!(self.manager.is_session_active());
    }
}

#[tokio::test]
async fn test_login_failure_posts_exactly_one_notice() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "wrong");

    let id = h.start();
    h.manager.login_result(id, false, Some("Invalid password"));
    h.manager.game_load_result(id, true, None);
    // A duplicate report for the doomed request changes nothing.
    h.manager.login_result(id + 1, false, Some("stale"));
    h.ui.flush().await;

    assert!(!h.manager.is_session_active());
    assert_eq!(
        *h.notices.notices.lock(),
        vec![Notice::LoginFailed("Invalid password".into())]
    );
}

#[tokio::test]
async fn test_password_login_saves_api_token() {
    let h = harness(Some(200));
    let store = Arc::new(RecordingStore::default());
    h.manager.set_credential_store(store.clone());
    assert!(h.manager.initialize());

    h.manager.set_credentials("mario", "hunter2");
    h.activate();
    assert_eq!(
        *store.saved.lock(),
        vec![("mario".to_string(), "api-token".to_string())]
    );

    h.manager.set_token_credentials("mario", "api-token");
    h.activate();
    assert_eq!(store.saved.lock().len(), 1);
}

#[tokio::test]
async fn test_frame_and_state_queries_gated_on_active_session() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "hunter2");
    *h.engine.summary.lock() = Some(GameSummary {
        num_core: 120,
        num_unlocked: 15,
        points_core: 1000,
        points_unlocked: 100,
    });

    h.manager.do_frame();
    assert_eq!(h.engine.count("do_frame"), 0);
    assert!(h.manager.can_pause());
    assert_eq!(h.manager.serialize_progress(), None);
    assert_eq!(h.manager.rich_presence(), None);
    assert_eq!(h.manager.game_summary(), None);
    assert_eq!(h.manager.achievement_list_json(), None);

    h.activate();
    h.manager.do_frame();
    assert_eq!(h.engine.count("do_frame"), 1);
    assert!(!h.manager.can_pause());
    assert_eq!(h.manager.serialize_progress(), Some(vec![1, 2, 3]));
    assert_eq!(h.manager.game_summary().map(|s| s.num_core), Some(120));
    assert!(h.manager.rich_presence().is_some());
    assert_eq!(h.manager.achievement_list_json().as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_deserialize_allowed_only_in_window() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "hunter2");

    assert!(!h.manager.deserialize_progress(&[9]));

    let id = h.start();
    assert!(h.manager.deserialize_progress(&[9]));

    h.manager.game_load_result(id, false, Some("Unknown game"));
    assert!(!h.manager.deserialize_progress(&[9]));
    assert_eq!(h.engine.count("deserialize"), 1);
}

fn session_started(num_achievements: u32, num_unlocked: u32) -> AchievementEvent {
    AchievementEvent::GameSessionStarted {
        game_title: "Super Mario 64".into(),
        badge_url: String::new(),
        num_achievements,
        num_unlocked,
    }
}

#[tokio::test]
async fn test_events_are_enriched_and_delivered_in_order() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "hunter2");
    *h.engine.summary.lock() = Some(GameSummary {
        num_core: 120,
        num_unlocked: 15,
        ..GameSummary::default()
    });

    // No active session yet: the engine summary is not consulted.
    h.manager.event(session_started(3, 1));

    h.activate();
    h.manager.event(session_started(0, 0));
    h.manager.event(AchievementEvent::LeaderboardTrackerShow {
        tracker_id: 1,
        display: "0:00".into(),
    });
    h.manager.event(AchievementEvent::GameCompleted {
        game_title: String::new(),
    });
    h.ui.flush().await;

    assert_eq!(
        *h.listener.events.lock(),
        vec![
            session_started(3, 1),
            session_started(120, 15),
            AchievementEvent::LeaderboardTrackerShow {
                tracker_id: 1,
                display: "0:00".into(),
            },
            AchievementEvent::GameCompleted {
                game_title: "Super Mario 64".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_hardcore_notice_only_when_enabled_after_init() {
    let h = harness(Some(200));
    h.manager.set_hardcore_enabled(true);
    h.ui.flush().await;
    assert!(h.notices.notices.lock().is_empty());

    assert!(h.manager.initialize());
    assert_eq!(h.engine.count("hardcore:true"), 1);

    h.manager.set_hardcore_enabled(false);
    h.manager.set_hardcore_enabled(true);
    h.ui.flush().await;
    assert_eq!(*h.notices.notices.lock(), vec![Notice::HardcoreActive]);

    assert!(!h.manager.is_hardcore_session_active());
    h.manager.set_credentials("mario", "hunter2");
    h.activate();
    assert!(h.manager.is_hardcore_session_active());
}

#[tokio::test]
async fn test_server_call_round_trip_through_bridge() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());

    h.manager.server_call(ServerCall {
        url: "http://127.0.0.1/dorequest.php".into(),
        body: Some("r=patch&g=1".into()),
        target: TargetToken(11),
        data: DataToken(22),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        *h.engine.responses.lock(),
        vec![(TargetToken(11), DataToken(22), 200, "{\"Success\":true}".to_string())]
    );
    assert_eq!(h.manager.bridge_stats().map(|s| s.delivered), Some(1));
}

#[tokio::test]
async fn test_shutdown_drops_late_work_and_destroys_client() {
    let h = harness(Some(200));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "hunter2");
    h.manager.set_memory_reader(Some(Arc::new(AddressMemory)));
    h.activate();

    h.manager.shutdown();
    assert_eq!(h.engine.count("unload_game"), 1);
    assert_eq!(h.engine.count("destroy_client"), 1);
    assert!(!h.manager.is_session_active());
    assert!(h.manager.bridge_stats().is_none());

    let mut buf = [0u8; 4];
    assert_eq!(h.manager.read_memory(0x100, &mut buf), 0);

    h.manager.server_call(ServerCall {
        url: "http://127.0.0.1/dorequest.php".into(),
        body: None,
        target: TargetToken(1),
        data: DataToken(2),
    });
    h.manager.login_result(h.engine.request_id(), true, None);
    h.manager.event(AchievementEvent::HardcoreReset);
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.ui.flush().await;

    assert!(h.engine.responses.lock().is_empty());
    assert!(h.listener.events.lock().is_empty());

    // A fresh initialization gets a fresh bridge.
    assert!(h.manager.initialize());
    assert_eq!(h.manager.bridge_stats().map(|s| s.dispatched), Some(0));
}

#[tokio::test]
async fn test_memory_reads_forwarded_to_reader() {
    let h = harness(Some(200));
    let mut buf = [0u8; 3];
    assert_eq!(h.manager.read_memory(0x10, &mut buf), 0);

    h.manager.set_memory_reader(Some(Arc::new(AddressMemory)));
    assert_eq!(h.manager.read_memory(0x10, &mut buf), 3);
    assert_eq!(buf, [0x10, 0x11, 0x12]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_waits_for_response_inside_engine() {
    let h = harness(Some(200));
    *h.engine.deliver_delay.lock() = Some(Duration::from_millis(300));
    assert!(h.manager.initialize());

    h.manager.server_call(ServerCall {
        url: "http://127.0.0.1/dorequest.php".into(),
        body: Some("r=login2".into()),
        target: TargetToken(3),
        data: DataToken(4),
    });
    for _ in 0..200 {
        if h.engine.position("deliver_start").is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(h.engine.position("deliver_start").is_some());

    h.manager.shutdown();

    let delivered = h.engine.position("deliver_end").unwrap();
    let destroyed = h.engine.position("destroy_client").unwrap();
    assert!(delivered < destroyed, "calls: {:?}", h.engine.calls.lock());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_waits_for_session_start_in_progress() {
    let h = harness(Some(200));
    *h.engine.login_delay.lock() = Some(Duration::from_millis(300));
    assert!(h.manager.initialize());
    h.manager.set_credentials("mario", "hunter2");

    let starter = {
        let manager = h.manager.clone();
        std::thread::spawn(move || manager.start_session("/roms/sm64.z64"))
    };
    for _ in 0..200 {
        if h.engine.position("login_password").is_some() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(h.engine.position("login_password").is_some());

    h.manager.shutdown();
    assert!(starter.join().unwrap());

    let loaded = h.engine.position("load:path-hash").unwrap();
    let destroyed = h.engine.position("destroy_client").unwrap();
    assert!(loaded < destroyed, "calls: {:?}", h.engine.calls.lock());
    assert!(!h.manager.start_session("/roms/sm64.z64"));
}
