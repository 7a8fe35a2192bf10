use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Status handed to the engine when the transport itself failed (DNS, timeout, reset).
/// Negative so it can never collide with a real HTTP status.
pub const TRANSPORT_FAILURE_STATUS: i32 = -2;

/// Connect and read timeout for engine server calls (30 s).
pub const HTTP_TIMEOUT_MS: u64 = 30_000;

/// Timeout for badge image downloads (10 s).
pub const BADGE_TIMEOUT_MS: u64 = 10_000;

/// How long a popup stays on screen before it starts dismissing itself.
pub const POPUP_DISPLAY_MS: u64 = 4_000;

/// Length of the popup enter/exit transition.
pub const POPUP_EXIT_MS: u64 = 300;

/// Pause between one popup leaving and the next queued one appearing.
pub const POPUP_GAP_MS: u64 = 200;

/// User agent sent with every engine server call.
pub const USER_AGENT: &str = concat!("ra-session-engine/", env!("CARGO_PKG_VERSION"));

/// Popup timing used by the notification scheduler.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OverlayTiming {
    pub display_ms: u64,
    pub exit_ms: u64,
    pub gap_ms: u64,
}

impl OverlayTiming {
    pub fn display(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }

    pub fn exit(&self) -> Duration {
        Duration::from_millis(self.exit_ms)
    }

    pub fn gap(&self) -> Duration {
        Duration::from_millis(self.gap_ms)
    }
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            display_ms: POPUP_DISPLAY_MS,
            exit_ms: POPUP_EXIT_MS,
            gap_ms: POPUP_GAP_MS,
        }
    }
}

/// Top-level configuration for the achievements bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// TCP connect timeout for server calls.
    pub connect_timeout_ms: u64,
    /// Read timeout for server calls.
    pub read_timeout_ms: u64,
    /// User agent sent with server calls.
    pub user_agent: String,
    /// Timeout for badge image fetches.
    pub badge_timeout_ms: u64,
    pub overlay: OverlayTiming,
}

impl BridgeConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| anyhow!("invalid bridge config: {}", e))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn badge_timeout(&self) -> Duration {
        Duration::from_millis(self.badge_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: HTTP_TIMEOUT_MS,
            read_timeout_ms: HTTP_TIMEOUT_MS,
            user_agent: USER_AGENT.to_string(),
            badge_timeout_ms: BADGE_TIMEOUT_MS,
            overlay: OverlayTiming::default(),
        }
    }
}
