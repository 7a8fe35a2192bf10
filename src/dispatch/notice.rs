use std::fmt;

/// A transient, user-visible message (a toast on most hosts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoginFailed(String),
    GameLoadFailed(String),
    HardcoreActive,
}

impl Notice {
    pub(crate) fn reason(error: Option<&str>) -> String {
        error
            .filter(|e| !e.is_empty())
            .unwrap_or("unknown error")
            .to_string()
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoginFailed(reason) => write!(f, "RetroAchievements login failed: {}", reason),
            Notice::GameLoadFailed(reason) => {
                write!(f, "RetroAchievements game load failed: {}", reason)
            }
            Notice::HardcoreActive => f.write_str("RetroAchievements hardcore mode active"),
        }
    }
}

/// Host-side presenter for notices. Only ever called on the UI context.
pub trait NoticeSink: Send + Sync {
    fn show_notice(&self, notice: &Notice);
}
