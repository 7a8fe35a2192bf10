use crate::dispatch::events::AchievementEvent;

/// Opaque engine handle naming the callback a server response must be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetToken(pub u64);

/// Opaque engine handle unique to one outstanding server call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataToken(pub u64);

/// An outbound HTTP request issued by the engine.
#[derive(Debug, Clone)]
pub struct ServerCall {
    pub url: String,
    /// Form-encoded POST body; `None` or empty means GET.
    pub body: Option<String>,
    pub target: TargetToken,
    pub data: DataToken,
}

/// Where a game hash is computed from.
#[derive(Debug, Clone, Copy)]
pub enum RomSource<'a> {
    Path(&'a str),
    Data(&'a [u8]),
}

/// Achievement counts for the loaded game, as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameSummary {
    pub num_core: u32,
    pub num_unlocked: u32,
    pub points_core: u32,
    pub points_unlocked: u32,
}

/// Receives transport results for engine server calls.
pub trait ResponseSink: Send + Sync {
    fn deliver(&self, target: TargetToken, data: DataToken, status: i32, body: &str);
}

/// Outbound calls into the achievement engine.
///
/// Implementations wrap the foreign client; every method must be callable from any thread.
/// The `begin_*` calls return whether the operation was queued, and report their result later
/// through [`EngineCallbacks`] tagged with the same `request_id`.
pub trait AchievementEngine: Send + Sync {
    fn create_client(&self) -> bool;
    fn destroy_client(&self);

    fn console_id(&self) -> u32;
    fn generate_hash(&self, console_id: u32, rom: RomSource<'_>) -> Option<String>;

    fn begin_login_with_password(&self, username: &str, password: &str, request_id: u64) -> bool;
    fn begin_login_with_token(&self, username: &str, token: &str, request_id: u64) -> bool;
    fn begin_identify_and_load(&self, console_id: u32, hash: &str, request_id: u64) -> bool;

    fn do_frame(&self);
    fn reset(&self);
    fn unload_game(&self);
    fn set_hardcore_enabled(&self, enabled: bool);
    fn user_token(&self) -> Option<String>;

    fn serialize_progress(&self) -> Option<Vec<u8>>;
    fn deserialize_progress(&self, data: &[u8]) -> bool;
    fn can_pause(&self) -> bool;
    fn game_summary(&self) -> Option<GameSummary>;
    fn rich_presence(&self) -> Option<String>;
    fn achievement_list_json(&self) -> Option<String>;

    fn deliver_server_response(&self, target: TargetToken, data: DataToken, status: i32, body: &str);
}

/// Inbound calls from the engine. May arrive on any thread and must not block.
pub trait EngineCallbacks: Send + Sync {
    fn read_memory(&self, address: u32, buffer: &mut [u8]) -> usize;
    fn server_call(&self, call: ServerCall);
    fn login_result(&self, request_id: u64, success: bool, error: Option<&str>);
    fn game_load_result(&self, request_id: u64, success: bool, error: Option<&str>);
    fn event(&self, event: AchievementEvent);
}

/// Source of emulated memory for the engine's condition evaluation.
pub trait MemoryReader: Send + Sync {
    fn read_memory(&self, address: u32, buffer: &mut [u8]) -> usize;
}
