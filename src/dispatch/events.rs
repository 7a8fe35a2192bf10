// Achievement events and the single-listener dispatcher.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::ui::UiContext;

/// Everything the engine reports about play, as one tagged union.
#[derive(Debug, Clone, PartialEq)]
pub enum AchievementEvent {
    AchievementTriggered {
        id: i32,
        title: String,
        description: String,
        badge_url: String,
        points: u32,
    },
    AchievementProgressUpdated {
        id: i32,
        title: String,
        measured_progress: String,
        measured_percent: f32,
    },
    AchievementProgressHidden,
    /// `game_title` may be empty when the engine does not know it; the manager fills it in.
    GameCompleted {
        game_title: String,
    },
    SubsetCompleted {
        subset_title: String,
    },
    /// Counts are filled from the engine's game summary by the manager.
    GameSessionStarted {
        game_title: String,
        badge_url: String,
        num_achievements: u32,
        num_unlocked: u32,
    },
    ChallengeIndicatorShow {
        id: i32,
        title: String,
        badge_url: String,
    },
    ChallengeIndicatorHide {
        id: i32,
    },
    LeaderboardStarted {
        title: String,
        description: String,
    },
    LeaderboardFailed {
        title: String,
    },
    LeaderboardSubmitted {
        title: String,
        score: String,
        best_score: String,
        new_rank: u32,
        num_entries: u32,
    },
    LeaderboardTrackerShow {
        tracker_id: i32,
        display: String,
    },
    LeaderboardTrackerUpdate {
        tracker_id: i32,
        display: String,
    },
    LeaderboardTrackerHide {
        tracker_id: i32,
    },
    ServerError {
        api: String,
        message: String,
    },
    ConnectionChanged {
        connected: bool,
    },
    HardcoreReset,
}

impl AchievementEvent {
    /// Log the event at the level its kind deserves.
    fn trace(&self) {
        match self {
            Self::AchievementTriggered { title, points, .. } => {
                info!("achievement triggered: {} ({} pts)", title, points)
            }
            Self::GameCompleted { game_title } => info!("game completed: {}", game_title),
            Self::SubsetCompleted { subset_title } => info!("subset completed: {}", subset_title),
            Self::GameSessionStarted { game_title, .. } => {
                info!("game session started: {}", game_title)
            }
            Self::LeaderboardSubmitted { title, score, .. } => {
                info!("leaderboard submitted: {} - {}", title, score)
            }
            Self::ServerError { api, message } => warn!("server error [{}]: {}", api, message),
            Self::ConnectionChanged { connected } => {
                info!("connection {}", if *connected { "restored" } else { "lost" })
            }
            Self::HardcoreReset => info!("hardcore reset requested"),
            other => debug!("achievement event: {:?}", other),
        }
    }
}

/// Host-side receiver of achievement events. Only ever called on the UI context.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &AchievementEvent);
}

type ListenerSlot = Arc<RwLock<Option<Arc<dyn EventListener>>>>;

/// Forwards engine events to at most one listener, always on the UI context.
pub struct EventDispatcher {
    listener: ListenerSlot,
    ui: UiContext,
}

impl EventDispatcher {
    pub fn new(ui: UiContext) -> Self {
        Self {
            listener: Arc::new(RwLock::new(None)),
            ui,
        }
    }

    /// Replace the current listener.
    pub fn set_listener(&self, listener: Arc<dyn EventListener>) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    pub fn has_listener(&self) -> bool {
        self.listener.read().is_some()
    }

    /// Post the event to the UI context. Never blocks the calling thread.
    pub fn dispatch(&self, event: AchievementEvent) {
        event.trace();
        let slot = Arc::clone(&self.listener);
        let posted = self.ui.post(move || {
            // One read per event; the lock is released before the listener runs.
            let listener = slot.read().clone();
            if let Some(listener) = listener {
                listener.on_event(&event);
            }
        });
        if !posted {
            warn!("ui context closed, event dropped");
        }
    }
}
