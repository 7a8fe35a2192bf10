// Host start-up hook: frb utilities plus the tracing subscriber for session, bridge and overlay
// logging.

use std::sync::Once;
use tracing::info;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Variable read before `RUST_LOG`, so a host can scope achievement logging on its own.
pub const LOG_ENV_VAR: &str = "RA_SESSION_LOG";

/// Server calls log at debug under this crate; transport internals stay quiet.
const DEFAULT_LOG_FILTER: &str = "info,ra_session_engine=debug,hyper=warn,reqwest=warn";

/// Filter built from `directives` when given and valid, otherwise the crate default.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[flutter_rust_bridge::frb(init)]
pub fn init_app() {
    flutter_rust_bridge::setup_default_user_utils();

    INIT_TRACING.call_once(|| {
        let directives = std::env::var(LOG_ENV_VAR)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        let _ = tracing_subscriber::fmt()
            .with_env_filter(log_filter(directives.as_deref()))
            .with_target(true)
            .try_init();

        info!(target: "ra_session_engine", "achievement session logging initialized");
    });
}
