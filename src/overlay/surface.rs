use std::time::Duration;

use super::badge::Badge;

/// Persistent overlay containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRegion {
    /// Leaderboard trackers, bottom-right.
    Trackers,
    /// Challenge indicators, bottom-left.
    Indicators,
}

/// Handle the scheduler assigns to a view inside a region; unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupStyle {
    Standard,
    /// Highlighted frame for game and subset mastery.
    Mastery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupProgress {
    pub text: String,
    pub percent: u8,
}

/// Everything the host needs to render one popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub style: PopupStyle,
    pub title: String,
    pub description: Option<String>,
    /// Already formatted, e.g. `+10`.
    pub points: Option<String>,
    pub progress: Option<PopupProgress>,
    pub badge_url: Option<String>,
}

impl PopupContent {
    fn plain(style: PopupStyle, title: String, description: String) -> Self {
        Self {
            style,
            title,
            description: Some(description),
            points: None,
            progress: None,
            badge_url: None,
        }
    }

    pub fn achievement(title: &str, description: &str, badge_url: &str, points: u32) -> Self {
        Self {
            points: Some(format!("+{}", points)),
            badge_url: non_empty(badge_url),
            ..Self::plain(PopupStyle::Standard, title.to_string(), description.to_string())
        }
    }

    pub fn progress(title: &str, measured_progress: &str, measured_percent: f32) -> Self {
        Self {
            style: PopupStyle::Standard,
            title: title.to_string(),
            description: None,
            points: None,
            progress: Some(PopupProgress {
                text: measured_progress.to_string(),
                percent: measured_percent.round().clamp(0.0, 100.0) as u8,
            }),
            badge_url: None,
        }
    }

    pub fn now_playing(game_title: &str, badge_url: &str, num_achievements: u32, num_unlocked: u32) -> Self {
        let mut description = game_title.to_string();
        if num_achievements > 0 {
            description.push_str(&format!("\n{} of {} achievements", num_unlocked, num_achievements));
        }
        Self {
            badge_url: non_empty(badge_url),
            ..Self::plain(PopupStyle::Standard, "Now Playing".to_string(), description)
        }
    }

    pub fn game_mastered(game_title: &str) -> Self {
        Self::plain(PopupStyle::Mastery, "Game Mastered".to_string(), game_title.to_string())
    }

    pub fn subset_mastered(subset_title: &str) -> Self {
        Self::plain(PopupStyle::Mastery, "Subset Mastered".to_string(), subset_title.to_string())
    }

    pub fn leaderboard_started(title: &str, description: &str) -> Self {
        Self::plain(
            PopupStyle::Standard,
            format!("Leaderboard: {}", title),
            description.to_string(),
        )
    }

    pub fn leaderboard_failed(title: &str) -> Self {
        Self::plain(PopupStyle::Standard, "Leaderboard Failed".to_string(), title.to_string())
    }

    pub fn leaderboard_submitted(title: &str, score: &str, new_rank: u32, num_entries: u32) -> Self {
        let detail = if new_rank > 0 {
            format!("{} (rank {} of {})", score, new_rank, num_entries)
        } else {
            score.to_string()
        };
        Self::plain(PopupStyle::Standard, format!("Leaderboard: {}", title), detail)
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Host renderer for the overlay. Every method is called on the UI context with no scheduler
/// lock held, so an implementation may query the scheduler from inside a call.
pub trait OverlaySurface: Send + Sync {
    /// Make the popup visible with `content`, playing an enter transition of `enter`.
    fn show_popup(&self, content: &PopupContent, enter: Duration);
    /// Start the popup's exit transition. The scheduler calls `hide_popup` once it has elapsed.
    fn begin_popup_exit(&self, exit: Duration);
    fn hide_popup(&self);
    /// `None` clears the badge.
    fn set_popup_badge(&self, badge: Option<&Badge>);

    fn set_region_visible(&self, region: OverlayRegion, visible: bool);
    fn add_tracker(&self, view: ViewHandle, display: &str);
    fn set_tracker_text(&self, view: ViewHandle, display: &str);
    fn add_indicator(&self, view: ViewHandle, title: &str);
    fn set_indicator_badge(&self, view: ViewHandle, badge: &Badge);
    fn remove_view(&self, region: OverlayRegion, view: ViewHandle);
}
