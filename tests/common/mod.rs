// Shared fakes for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use ra_session_engine::dispatch::events::{AchievementEvent, EventListener};
use ra_session_engine::dispatch::notice::{Notice, NoticeSink};
use ra_session_engine::engine::manager::CredentialStore;
use ra_session_engine::engine::traits::{
    AchievementEngine, DataToken, GameSummary, MemoryReader, RomSource, TargetToken,
};
use ra_session_engine::transport::traits::{HttpResponse, Transport};

/// Scriptable engine that records every call by name.
pub struct FakeEngine {
    pub login_queues: AtomicBool,
    pub load_queues: AtomicBool,
    pub path_hash: Mutex<Option<String>>,
    pub data_hash: Mutex<Option<String>>,
    pub summary: Mutex<Option<GameSummary>>,
    pub token: Mutex<Option<String>>,
    pub last_request: AtomicU64,
    pub calls: Mutex<Vec<String>>,
    pub responses: Mutex<Vec<(TargetToken, DataToken, i32, String)>>,
    /// Blocks `begin_login_*` for this long, as a slow engine would.
    pub login_delay: Mutex<Option<Duration>>,
    /// Blocks `deliver_server_response` for this long between its start and end records.
    pub deliver_delay: Mutex<Option<Duration>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            login_queues: AtomicBool::new(true),
            load_queues: AtomicBool::new(true),
            path_hash: Mutex::new(Some("path-hash".into())),
            data_hash: Mutex::new(Some("data-hash".into())),
            summary: Mutex::new(None),
            token: Mutex::new(Some("api-token".into())),
            last_request: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            login_delay: Mutex::new(None),
            deliver_delay: Mutex::new(None),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn request_id(&self) -> u64 {
        self.last_request.load(Ordering::SeqCst)
    }

    /// Position of the first call named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c.as_str() == name)
    }

    fn pause(delay: &Mutex<Option<Duration>>) {
        let delay = *delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl AchievementEngine for FakeEngine {
    fn create_client(&self) -> bool {
        self.record("create_client");
        true
    }

    fn destroy_client(&self) {
        self.record("destroy_client");
    }

    fn console_id(&self) -> u32 {
        2
    }

    fn generate_hash(&self, _console_id: u32, rom: RomSource<'_>) -> Option<String> {
        match rom {
            RomSource::Data(_) => {
                self.record("hash_data");
                self.data_hash.lock().clone()
            }
            RomSource::Path(_) => {
                self.record("hash_path");
                self.path_hash.lock().clone()
            }
        }
    }

    fn begin_login_with_password(&self, _username: &str, _password: &str, request_id: u64) -> bool {
        self.record("login_password");
        self.last_request.store(request_id, Ordering::SeqCst);
        Self::pause(&self.login_delay);
        self.login_queues.load(Ordering::SeqCst)
    }

    fn begin_login_with_token(&self, _username: &str, _token: &str, request_id: u64) -> bool {
        self.record("login_token");
        self.last_request.store(request_id, Ordering::SeqCst);
        Self::pause(&self.login_delay);
        self.login_queues.load(Ordering::SeqCst)
    }

    fn begin_identify_and_load(&self, _console_id: u32, hash: &str, request_id: u64) -> bool {
        self.record(format!("load:{}", hash));
        self.last_request.store(request_id, Ordering::SeqCst);
        self.load_queues.load(Ordering::SeqCst)
    }

    fn do_frame(&self) {
        self.record("do_frame");
    }

    fn reset(&self) {
        self.record("reset");
    }

    fn unload_game(&self) {
        self.record("unload_game");
    }

    fn set_hardcore_enabled(&self, enabled: bool) {
        self.record(format!("hardcore:{}", enabled));
    }

    fn user_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn serialize_progress(&self) -> Option<Vec<u8>> {
        self.record("serialize");
        Some(vec![1, 2, 3])
    }

    fn deserialize_progress(&self, _data: &[u8]) -> bool {
        self.record("deserialize");
        true
    }

    fn can_pause(&self) -> bool {
        false
    }

    fn game_summary(&self) -> Option<GameSummary> {
        *self.summary.lock()
    }

    fn rich_presence(&self) -> Option<String> {
        Some("Exploring Bob-omb Battlefield".into())
    }

    fn achievement_list_json(&self) -> Option<String> {
        Some("[]".into())
    }

    fn deliver_server_response(&self, target: TargetToken, data: DataToken, status: i32, body: &str) {
        self.record("deliver_start");
        Self::pause(&self.deliver_delay);
        self.record("deliver_end");
        self.responses
            .lock()
            .push((target, data, status, body.to_string()));
    }
}

/// Answers every call with a fixed status, or fails when `status` is `None`.
pub struct FixedTransport {
    pub status: Option<u16>,
}

#[async_trait]
impl Transport for FixedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.post(url, "").await
    }

    async fn post(&self, _url: &str, _body: &str) -> Result<HttpResponse> {
        match self.status {
            Some(status) => Ok(HttpResponse {
                status,
                body: "{\"Success\":true}".into(),
            }),
            None => Err(anyhow!("connection refused")),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotices {
    pub notices: Mutex<Vec<Notice>>,
}

impl NoticeSink for RecordingNotices {
    fn show_notice(&self, notice: &Notice) {
        self.notices.lock().push(notice.clone());
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<AchievementEvent>>,
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &AchievementEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub saved: Mutex<Vec<(String, String)>>,
}

impl CredentialStore for RecordingStore {
    fn save_token(&self, username: &str, token: &str) {
        self.saved.lock().push((username.to_string(), token.to_string()));
    }
}

/// Memory where every byte equals the low byte of its address.
pub struct AddressMemory;

impl MemoryReader for AddressMemory {
    fn read_memory(&self, address: u32, buffer: &mut [u8]) -> usize {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = address.wrapping_add(i as u32) as u8;
        }
        buffer.len()
    }
}
