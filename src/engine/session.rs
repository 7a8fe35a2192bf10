// Session coordinator: joins the login and game-load halves into one fenced session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::traits::{AchievementEngine, RomSource};
use crate::dispatch::notice::Notice;

/// One attempt to log in and load a game, identified by `request_id`.
///
/// `request_id == 0` is the idle descriptor. `active` is kept equal to
/// `login_completed && load_completed && login_succeeded && load_succeeded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub request_id: u64,
    pub login_completed: bool,
    pub login_succeeded: bool,
    pub load_completed: bool,
    pub load_succeeded: bool,
    pub active: bool,
}

impl Session {
    fn begin(request_id: u64) -> Self {
        Self {
            request_id,
            ..Self::default()
        }
    }

    fn complete_login(&mut self, success: bool) {
        self.login_completed = true;
        self.login_succeeded = success;
        self.recompute();
    }

    fn complete_load(&mut self, success: bool) {
        self.load_completed = true;
        self.load_succeeded = success;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.active =
            self.login_completed && self.load_completed && self.login_succeeded && self.load_succeeded;
    }

    pub fn is_idle(&self) -> bool {
        self.request_id == 0
    }

    /// A request is outstanding and at least one half has not reported yet.
    pub fn is_starting(&self) -> bool {
        !self.is_idle() && (!self.login_completed || !self.load_completed)
    }

    /// One of the halves has already reported failure.
    pub fn has_failed(&self) -> bool {
        (self.login_completed && !self.login_succeeded) || (self.load_completed && !self.load_succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Password,
    Token,
}

/// Stored login. The secret is a password or an API token depending on `kind`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
    pub kind: CredentialKind,
}

/// What became of a login or load result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Not for the current request (or the coordinator is down); nothing changed.
    Stale,
    Accepted { active: bool },
    /// The half failed; the notice should be shown exactly once.
    Failed(Notice),
}

#[derive(Default)]
struct CoordinatorState {
    session: Session,
    request_counter: u64,
    credentials: Option<Credentials>,
}

pub struct SessionCoordinator {
    engine: Arc<dyn AchievementEngine>,
    state: Mutex<CoordinatorState>,
    /// Serializes client setup and teardown against the engine calls that need a live client.
    /// Never taken by the result callbacks, which only touch `state`.
    lifecycle: Mutex<()>,
    initialized: AtomicBool,
    shutting_down: AtomicBool,
}

impl SessionCoordinator {
    pub fn new(engine: Arc<dyn AchievementEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(CoordinatorState::default()),
            lifecycle: Mutex::new(()),
            initialized: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Held by `initialize` and `shutdown` for their whole run, and by every operation that
    /// must not see the engine client destroyed halfway through.
    pub(crate) fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock()
    }

    pub fn mark_initialized(&self) {
        let mut state = self.state.lock();
        state.session = Session::default();
        self.shutting_down.store(false, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
    }

    /// Poison the coordinator: from here on every completion is stale.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn finish_shutdown(&self) {
        let mut state = self.state.lock();
        state.session = Session::default();
        self.initialized.store(false, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // ========== Credentials ==========

    pub fn set_password_credentials(&self, username: &str, password: &str) {
        self.store_credentials(Some(Credentials {
            username: username.to_string(),
            secret: password.to_string(),
            kind: CredentialKind::Password,
        }));
        info!("password credentials set for user: {}", username);
    }

    pub fn set_token_credentials(&self, username: &str, token: &str) {
        self.store_credentials(Some(Credentials {
            username: username.to_string(),
            secret: token.to_string(),
            kind: CredentialKind::Token,
        }));
        info!("token credentials set for user: {}", username);
    }

    pub fn clear_credentials(&self) {
        self.store_credentials(None);
        info!("credentials cleared");
    }

    fn store_credentials(&self, credentials: Option<Credentials>) {
        let mut state = self.state.lock();
        state.credentials = credentials;
        state.session = Session::default();
    }

    pub fn has_credentials(&self) -> bool {
        self.state.lock().credentials.is_some()
    }

    pub fn username(&self) -> Option<String> {
        self.state
            .lock()
            .credentials
            .as_ref()
            .map(|c| c.username.clone())
    }

    pub fn credential_kind(&self) -> Option<CredentialKind> {
        self.state.lock().credentials.as_ref().map(|c| c.kind)
    }

    // ========== Session lifecycle ==========

    /// Hash the game through the engine, preferring in-memory ROM data over the path.
    pub fn content_hash(&self, rom_path: Option<&str>, rom_data: Option<&[u8]>) -> Option<String> {
        if !self.is_initialized() {
            warn!("not initialized, cannot generate hash");
            return None;
        }
        let console_id = self.engine.console_id();

        if let Some(data) = rom_data.filter(|d| !d.is_empty()) {
            match self.engine.generate_hash(console_id, RomSource::Data(data)) {
                Some(hash) if !hash.is_empty() => return Some(hash),
                _ => warn!("failed to hash rom data, falling back to path"),
            }
        }

        rom_path
            .filter(|p| !p.is_empty())
            .and_then(|p| self.engine.generate_hash(console_id, RomSource::Path(p)))
            .filter(|hash| !hash.is_empty())
    }

    pub fn start_session(&self, rom_path: &str) -> bool {
        self.start_session_from(Some(rom_path), None)
    }

    /// Queue login and game identification for a new request. `true` means both halves were
    /// queued, not that the session is active.
    pub fn start_session_from(&self, rom_path: Option<&str>, rom_data: Option<&[u8]>) -> bool {
        let _lifecycle = self.lifecycle();
        if !self.is_initialized() || self.is_shutting_down() {
            warn!("not initialized, cannot start session");
            return false;
        }

        let Some(credentials) = self.state.lock().credentials.clone() else {
            warn!("no credentials set, cannot start session");
            return false;
        };

        let Some(hash) = self.content_hash(rom_path, rom_data) else {
            warn!("failed to generate game hash");
            return false;
        };

        let request_id = {
            let mut state = self.state.lock();
            state.request_counter += 1;
            let id = state.request_counter;
            state.session = Session::begin(id);
            id
        };

        // The engine may report a result synchronously, so only the lifecycle lock is held
        // across these calls.
        let login_queued = match credentials.kind {
            CredentialKind::Password => self.engine.begin_login_with_password(
                &credentials.username,
                &credentials.secret,
                request_id,
            ),
            CredentialKind::Token => self.engine.begin_login_with_token(
                &credentials.username,
                &credentials.secret,
                request_id,
            ),
        };
        let console_id = self.engine.console_id();
        let load_queued = self
            .engine
            .begin_identify_and_load(console_id, &hash, request_id);

        if login_queued && load_queued {
            info!("session queued for hash {} (request {})", hash, request_id);
            return true;
        }

        {
            // A half that was never queued counts as failed, so the other half alone can
            // never make this request active.
            let mut state = self.state.lock();
            if state.session.request_id == request_id {
                if !login_queued {
                    state.session.complete_login(false);
                }
                if !load_queued {
                    state.session.complete_load(false);
                }
            }
        }
        warn!(
            "failed to queue session request {} (login={}, load={})",
            request_id, login_queued, load_queued
        );
        false
    }

    fn accepts(&self, request_id: u64, state: &CoordinatorState) -> bool {
        request_id != 0
            && request_id == state.session.request_id
            && self.is_initialized()
            && !self.is_shutting_down()
    }

    pub fn on_login_result(&self, request_id: u64, success: bool, error: Option<&str>) -> Completion {
        let active = {
            let mut state = self.state.lock();
            if !self.accepts(request_id, &state) {
                debug!("ignoring stale login result (request {})", request_id);
                return Completion::Stale;
            }
            state.session.complete_login(success);
            state.session.active
        };

        if success {
            info!("login succeeded (request {})", request_id);
            Completion::Accepted { active }
        } else {
            warn!("login failed (request {}): {:?}", request_id, error);
            Completion::Failed(Notice::LoginFailed(Notice::reason(error)))
        }
    }

    pub fn on_game_load_result(&self, request_id: u64, success: bool, error: Option<&str>) -> Completion {
        let active = {
            let mut state = self.state.lock();
            if !self.accepts(request_id, &state) {
                debug!("ignoring stale game load result (request {})", request_id);
                return Completion::Stale;
            }
            state.session.complete_load(success);
            state.session.active
        };

        if success {
            info!("game load succeeded (request {})", request_id);
            Completion::Accepted { active }
        } else {
            warn!("game load failed (request {}): {:?}", request_id, error);
            Completion::Failed(Notice::GameLoadFailed(Notice::reason(error)))
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.is_initialized() && self.state.lock().session.active
    }

    pub fn session(&self) -> Session {
        self.state.lock().session
    }

    /// Reset the engine's tracking state and drop back to the idle descriptor.
    pub fn reset(&self) {
        let _lifecycle = self.lifecycle();
        let was_active = {
            let mut state = self.state.lock();
            let was_active = state.session.active;
            state.session = Session::default();
            was_active
        };
        if self.is_initialized() && was_active {
            self.engine.reset();
            info!("achievement state reset");
        }
    }

    /// Unload the game from the engine and drop back to the idle descriptor.
    pub fn unload_game(&self) {
        let _lifecycle = self.lifecycle();
        if !self.is_initialized() {
            return;
        }
        self.state.lock().session = Session::default();
        self.engine.unload_game();
        info!("game unloaded");
    }

    /// Progress may be restored while active, or while still starting with no failed half.
    pub fn can_restore_progress(&self) -> bool {
        let session = self.state.lock().session;
        session.active || (session.is_starting() && !session.has_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_requires_both_halves() {
        let mut session = Session::begin(1);
        assert!(session.is_starting());

        session.complete_load(true);
        assert!(!session.active);
        assert!(session.is_starting());

        session.complete_login(true);
        assert!(session.active);
        assert!(!session.is_starting());
    }

    #[test]
    fn test_completion_order_is_irrelevant() {
        for login_first in [true, false] {
            for (login_ok, load_ok) in [(true, true), (true, false), (false, true), (false, false)] {
                let mut session = Session::begin(3);
                if login_first {
                    session.complete_login(login_ok);
                    session.complete_load(load_ok);
                } else {
                    session.complete_load(load_ok);
                    session.complete_login(login_ok);
                }
                assert_eq!(session.active, login_ok && load_ok);
                assert_eq!(session.has_failed(), !(login_ok && load_ok));
            }
        }
    }

    #[test]
    fn test_failed_half_is_detected_before_other_half() {
        let mut session = Session::begin(2);
        session.complete_login(false);
        assert!(session.is_starting());
        assert!(session.has_failed());
        assert!(!session.active);
    }

    #[test]
    fn test_idle_descriptor() {
        let session = Session::default();
        assert!(session.is_idle());
        assert!(!session.is_starting());
        assert!(!session.has_failed());
    }
}
