// Achievements manager: owns the session coordinator, request bridge and event dispatcher, and
// implements the inbound engine callback surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::bridge::RequestBridge;
use super::session::{Completion, CredentialKind, SessionCoordinator};
use super::stats::BridgeStatsSnapshot;
use super::traits::{
    AchievementEngine, DataToken, EngineCallbacks, GameSummary, MemoryReader, ResponseSink,
    ServerCall, TargetToken,
};
use crate::dispatch::events::{AchievementEvent, EventDispatcher, EventListener};
use crate::dispatch::notice::{Notice, NoticeSink};
use crate::dispatch::ui::UiContext;
use crate::transport::traits::Transport;

/// Persists the API token the engine hands out after a password login.
pub trait CredentialStore: Send + Sync {
    fn save_token(&self, username: &str, token: &str);
}

/// Routes bridge results into the engine.
struct EngineSink(Arc<dyn AchievementEngine>);

impl ResponseSink for EngineSink {
    fn deliver(&self, target: TargetToken, data: DataToken, status: i32, body: &str) {
        self.0.deliver_server_response(target, data, status, body);
    }
}

type NoticeSlot = Arc<RwLock<Option<Arc<dyn NoticeSink>>>>;

pub struct AchievementsManager {
    engine: Arc<dyn AchievementEngine>,
    transport: Arc<dyn Transport>,
    ui: UiContext,
    coordinator: SessionCoordinator,
    /// A fresh bridge per `initialize`; `None` while shut down.
    bridge: RwLock<Option<Arc<RequestBridge>>>,
    events: EventDispatcher,
    notices: NoticeSlot,
    memory: RwLock<Option<Arc<dyn MemoryReader>>>,
    credential_store: RwLock<Option<Arc<dyn CredentialStore>>>,
    hardcore: AtomicBool,
    game_title: Mutex<String>,
}

impl AchievementsManager {
    /// The host wires the engine's callbacks to the returned manager (it implements
    /// [`EngineCallbacks`]) before calling [`initialize`](Self::initialize).
    pub fn new(engine: Arc<dyn AchievementEngine>, transport: Arc<dyn Transport>, ui: UiContext) -> Self {
        Self {
            coordinator: SessionCoordinator::new(Arc::clone(&engine)),
            events: EventDispatcher::new(ui.clone()),
            engine,
            transport,
            ui,
            bridge: RwLock::new(None),
            notices: Arc::new(RwLock::new(None)),
            memory: RwLock::new(None),
            credential_store: RwLock::new(None),
            hardcore: AtomicBool::new(false),
            game_title: Mutex::new(String::new()),
        }
    }

    // ========== Lifecycle ==========

    pub fn initialize(&self) -> bool {
        let _lifecycle = self.coordinator.lifecycle();
        if self.coordinator.is_initialized() {
            debug!("already initialized");
            return true;
        }
        if !self.engine.create_client() {
            warn!("failed to create achievement client");
            return false;
        }

        let bridge = RequestBridge::new(
            Arc::clone(&self.transport),
            Arc::new(EngineSink(Arc::clone(&self.engine))),
            self.ui.runtime().clone(),
        );
        *self.bridge.write() = Some(Arc::new(bridge));

        self.engine
            .set_hardcore_enabled(self.hardcore.load(Ordering::SeqCst));
        self.coordinator.mark_initialized();
        info!("achievements manager initialized");
        true
    }

    /// Drop pending requests, unload an active game and destroy the engine client. Waits for a
    /// session start or a server response already inside the engine to return first.
    pub fn shutdown(&self) {
        let _lifecycle = self.coordinator.lifecycle();
        if !self.coordinator.is_initialized() {
            return;
        }
        self.coordinator.begin_shutdown();

        let bridge = self.bridge.write().take();
        if let Some(bridge) = bridge {
            bridge.shutdown();
        }
        if self.coordinator.session().active {
            self.engine.unload_game();
        }
        self.engine.destroy_client();
        *self.memory.write() = None;
        self.game_title.lock().clear();

        self.coordinator.finish_shutdown();
        info!("achievements manager shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.coordinator.is_initialized()
    }

    // ========== Host wiring ==========

    pub fn set_event_listener(&self, listener: Arc<dyn EventListener>) {
        self.events.set_listener(listener);
    }

    pub fn clear_event_listener(&self) {
        self.events.clear_listener();
    }

    pub fn set_notice_sink(&self, sink: Arc<dyn NoticeSink>) {
        *self.notices.write() = Some(sink);
    }

    pub fn set_memory_reader(&self, reader: Option<Arc<dyn MemoryReader>>) {
        *self.memory.write() = reader;
    }

    pub fn set_credential_store(&self, store: Arc<dyn CredentialStore>) {
        *self.credential_store.write() = Some(store);
    }

    // ========== Credentials & session ==========

    pub fn set_credentials(&self, username: &str, password: &str) {
        self.coordinator.set_password_credentials(username, password);
    }

    pub fn set_token_credentials(&self, username: &str, token: &str) {
        self.coordinator.set_token_credentials(username, token);
    }

    pub fn clear_credentials(&self) {
        self.coordinator.clear_credentials();
    }

    pub fn has_credentials(&self) -> bool {
        self.coordinator.has_credentials()
    }

    pub fn username(&self) -> Option<String> {
        self.coordinator.username()
    }

    pub fn generate_hash(&self, rom_path: &str) -> Option<String> {
        let _lifecycle = self.coordinator.lifecycle();
        self.coordinator.content_hash(Some(rom_path), None)
    }

    pub fn start_session(&self, rom_path: &str) -> bool {
        self.coordinator.start_session(rom_path)
    }

    pub fn start_session_from(&self, rom_path: Option<&str>, rom_data: Option<&[u8]>) -> bool {
        self.coordinator.start_session_from(rom_path, rom_data)
    }

    pub fn is_session_active(&self) -> bool {
        self.coordinator.is_session_active()
    }

    pub fn reset(&self) {
        self.coordinator.reset();
    }

    pub fn unload_game(&self) {
        self.coordinator.unload_game();
        self.game_title.lock().clear();
    }

    // ========== Hardcore ==========

    pub fn set_hardcore_enabled(&self, enabled: bool) {
        let _lifecycle = self.coordinator.lifecycle();
        self.hardcore.store(enabled, Ordering::SeqCst);
        if !self.coordinator.is_initialized() {
            return;
        }
        self.engine.set_hardcore_enabled(enabled);
        info!("hardcore mode {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.post_notice(Notice::HardcoreActive);
        }
    }

    pub fn is_hardcore_enabled(&self) -> bool {
        self.hardcore.load(Ordering::SeqCst)
    }

    /// Hardcore restrictions apply only to an active, logged-in session.
    pub fn is_hardcore_session_active(&self) -> bool {
        self.is_hardcore_enabled() && self.coordinator.has_credentials() && self.is_session_active()
    }

    // ========== Per-frame & state ==========

    pub fn do_frame(&self) {
        let _lifecycle = self.coordinator.lifecycle();
        if self.is_session_active() {
            self.engine.do_frame();
        }
    }

    pub fn can_pause(&self) -> bool {
        if !self.is_session_active() {
            return true;
        }
        self.engine.can_pause()
    }

    pub fn serialize_progress(&self) -> Option<Vec<u8>> {
        if !self.is_session_active() {
            return None;
        }
        self.engine.serialize_progress()
    }

    /// Restore a progress blob. Allowed while active, or while the session is still starting and
    /// neither half has failed.
    pub fn deserialize_progress(&self, data: &[u8]) -> bool {
        if data.is_empty() || !self.coordinator.is_initialized() {
            return false;
        }
        if !self.coordinator.can_restore_progress() {
            debug!("progress restore refused: no session in progress");
            return false;
        }
        self.engine.deserialize_progress(data)
    }

    pub fn game_summary(&self) -> Option<GameSummary> {
        if !self.is_session_active() {
            return None;
        }
        self.engine.game_summary()
    }

    pub fn rich_presence(&self) -> Option<String> {
        if !self.is_session_active() {
            return None;
        }
        self.engine.rich_presence()
    }

    pub fn achievement_list_json(&self) -> Option<String> {
        if !self.is_session_active() {
            return None;
        }
        self.engine.achievement_list_json()
    }

    pub fn bridge_stats(&self) -> Option<BridgeStatsSnapshot> {
        self.bridge.read().as_ref().map(|b| b.stats())
    }

    // ========== Internals ==========

    fn post_notice(&self, notice: Notice) {
        let slot = Arc::clone(&self.notices);
        let posted = self.ui.post(move || {
            let sink = slot.read().clone();
            match sink {
                Some(sink) => sink.show_notice(&notice),
                None => debug!("no notice sink: {}", notice),
            }
        });
        if !posted {
            warn!("ui context closed, notice dropped");
        }
    }

    fn handle_completion(&self, completion: Completion) -> bool {
        match completion {
            Completion::Stale => false,
            Completion::Accepted { active } => {
                if active {
                    info!("achievement session active");
                }
                true
            }
            Completion::Failed(notice) => {
                self.post_notice(notice);
                false
            }
        }
    }

    fn save_user_token(&self) {
        let Some(store) = self.credential_store.read().clone() else {
            return;
        };
        let Some(username) = self.coordinator.username() else {
            return;
        };
        match self.engine.user_token() {
            Some(token) if !token.is_empty() => {
                store.save_token(&username, &token);
                debug!("saved api token for {}", username);
            }
            _ => debug!("engine returned no api token"),
        }
    }

    fn enrich(&self, event: AchievementEvent) -> AchievementEvent {
        match event {
            AchievementEvent::GameSessionStarted {
                game_title,
                badge_url,
                num_achievements,
                num_unlocked,
            } => {
                *self.game_title.lock() = game_title.clone();
                let (num_achievements, num_unlocked) = match self.game_summary() {
                    Some(summary) => (summary.num_core, summary.num_unlocked),
                    None => (num_achievements, num_unlocked),
                };
                AchievementEvent::GameSessionStarted {
                    game_title,
                    badge_url,
                    num_achievements,
                    num_unlocked,
                }
            }
            AchievementEvent::GameCompleted { game_title } if game_title.is_empty() => {
                AchievementEvent::GameCompleted {
                    game_title: self.game_title.lock().clone(),
                }
            }
            other => other,
        }
    }
}

impl EngineCallbacks for AchievementsManager {
    fn read_memory(&self, address: u32, buffer: &mut [u8]) -> usize {
        let reader = self.memory.read().clone();
        match reader {
            Some(reader) => reader.read_memory(address, buffer),
            None => 0,
        }
    }

    fn server_call(&self, call: ServerCall) {
        let bridge = self.bridge.read().clone();
        match bridge {
            Some(bridge) => bridge.dispatch(call),
            None => warn!("ignoring server call: not initialized"),
        }
    }

    fn login_result(&self, request_id: u64, success: bool, error: Option<&str>) {
        let completion = self.coordinator.on_login_result(request_id, success, error);
        if self.handle_completion(completion)
            && self.coordinator.credential_kind() == Some(CredentialKind::Password)
        {
            self.save_user_token();
        }
    }

    fn game_load_result(&self, request_id: u64, success: bool, error: Option<&str>) {
        let completion = self
            .coordinator
            .on_game_load_result(request_id, success, error);
        self.handle_completion(completion);
    }

    fn event(&self, event: AchievementEvent) {
        if self.coordinator.is_shutting_down() {
            debug!("dropping event during shutdown");
            return;
        }
        let event = self.enrich(event);
        self.events.dispatch(event);
    }
}
