use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::engine::manager::AchievementsManager;
use crate::engine::stats::BridgeStatsSnapshot;

/// Achievement counts for the active game.
#[derive(Debug, Clone)]
pub struct SummaryInfo {
    pub num_core: u32,
    pub num_unlocked: u32,
    pub points_core: u32,
    pub points_unlocked: u32,
}

/// Server-call counters for the current bridge.
#[derive(Debug, Clone)]
pub struct RequestStats {
    pub dispatched: u64,
    pub delivered: u64,
    pub transport_failures: u64,
    pub dropped: u64,
    pub in_flight: u64,
}

impl From<BridgeStatsSnapshot> for RequestStats {
    fn from(s: BridgeStatsSnapshot) -> Self {
        Self {
            dispatched: s.dispatched,
            delivered: s.delivered,
            transport_failures: s.transport_failures,
            dropped: s.dropped,
            in_flight: s.in_flight,
        }
    }
}

static MANAGER: RwLock<Option<Arc<AchievementsManager>>> = parking_lot::const_rwlock(None);

fn with_manager<T>(op: &str, f: impl FnOnce(&AchievementsManager) -> T) -> Option<T> {
    let manager = MANAGER.read().clone();
    match manager {
        Some(manager) => Some(f(&manager)),
        None => {
            warn!("{}: no achievements manager installed", op);
            None
        }
    }
}

/// Install the manager the host functions act on, replacing (and shutting down) any previous one.
#[flutter_rust_bridge::frb(ignore)]
pub fn install_manager(manager: Arc<AchievementsManager>) {
    let previous = MANAGER.write().replace(manager);
    if let Some(previous) = previous {
        previous.shutdown();
    }
    info!("achievements manager installed");
}

#[flutter_rust_bridge::frb(ignore)]
pub fn installed_manager() -> Option<Arc<AchievementsManager>> {
    MANAGER.read().clone()
}

#[flutter_rust_bridge::frb(sync)]
pub fn initialize() -> bool {
    with_manager("initialize", |m| m.initialize()).unwrap_or(false)
}

/// Shut down the installed manager. It stays installed and can be initialized again.
#[flutter_rust_bridge::frb(sync)]
pub fn shutdown() {
    with_manager("shutdown", |m| m.shutdown());
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_credentials(username: String, password: String) {
    with_manager("set_credentials", |m| m.set_credentials(&username, &password));
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_token_credentials(username: String, token: String) {
    with_manager("set_token_credentials", |m| {
        m.set_token_credentials(&username, &token)
    });
}

#[flutter_rust_bridge::frb(sync)]
pub fn clear_credentials() {
    with_manager("clear_credentials", |m| m.clear_credentials());
}

/// Queue login and game load for the ROM at `rom_path`. `true` means queued, not active.
#[flutter_rust_bridge::frb(sync)]
pub fn start_session(rom_path: String) -> bool {
    with_manager("start_session", |m| m.start_session(&rom_path)).unwrap_or(false)
}

/// Like [`start_session`], hashing `rom_data` first and falling back to `rom_path`.
#[flutter_rust_bridge::frb(sync)]
pub fn start_session_with_data(rom_path: Option<String>, rom_data: Vec<u8>) -> bool {
    with_manager("start_session_with_data", |m| {
        m.start_session_from(rom_path.as_deref(), Some(&rom_data))
    })
    .unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn is_session_active() -> bool {
    with_manager("is_session_active", |m| m.is_session_active()).unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn reset() {
    with_manager("reset", |m| m.reset());
}

#[flutter_rust_bridge::frb(sync)]
pub fn unload_game() {
    with_manager("unload_game", |m| m.unload_game());
}

#[flutter_rust_bridge::frb(sync)]
pub fn do_frame() {
    with_manager("do_frame", |m| m.do_frame());
}

#[flutter_rust_bridge::frb(sync)]
pub fn set_hardcore_enabled(enabled: bool) {
    with_manager("set_hardcore_enabled", |m| m.set_hardcore_enabled(enabled));
}

#[flutter_rust_bridge::frb(sync)]
pub fn is_hardcore_session_active() -> bool {
    with_manager("is_hardcore_session_active", |m| m.is_hardcore_session_active())
        .unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn serialize_progress() -> Option<Vec<u8>> {
    with_manager("serialize_progress", |m| m.serialize_progress()).flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn deserialize_progress(data: Vec<u8>) -> bool {
    with_manager("deserialize_progress", |m| m.deserialize_progress(&data)).unwrap_or(false)
}

#[flutter_rust_bridge::frb(sync)]
pub fn can_pause() -> bool {
    with_manager("can_pause", |m| m.can_pause()).unwrap_or(true)
}

#[flutter_rust_bridge::frb(sync)]
pub fn rich_presence() -> Option<String> {
    with_manager("rich_presence", |m| m.rich_presence()).flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn game_summary() -> Option<SummaryInfo> {
    with_manager("game_summary", |m| m.game_summary())
        .flatten()
        .map(|s| SummaryInfo {
            num_core: s.num_core,
            num_unlocked: s.num_unlocked,
            points_core: s.points_core,
            points_unlocked: s.points_unlocked,
        })
}

/// The engine's achievement list as JSON text, decoded by the host.
#[flutter_rust_bridge::frb(sync)]
pub fn achievement_list_json() -> Option<String> {
    with_manager("achievement_list_json", |m| m.achievement_list_json()).flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn request_stats() -> Option<RequestStats> {
    with_manager("request_stats", |m| m.bridge_stats())
        .flatten()
        .map(RequestStats::from)
}
