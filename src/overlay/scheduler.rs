// Notification scheduler: one popup slot fed by a FIFO queue, plus the tracker and challenge
// indicator registries. Runs on the UI context; timers and badge loads post back to it.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::badge::{Badge, BadgeLoader};
use super::registry::{IndicatorEntry, Registry, TrackerEntry};
use super::surface::{OverlayRegion, OverlaySurface, PopupContent, ViewHandle};
use crate::config::OverlayTiming;
use crate::dispatch::events::{AchievementEvent, EventListener};
use crate::dispatch::ui::UiContext;
use crate::transport::http_transport::redact_query;

/// Popup slot. `Handoff` is the gap between one popup leaving and the next queued one appearing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Hidden,
    Handoff,
    Showing,
    Dismissing,
}

#[derive(Debug, Clone, Copy)]
enum BadgeTarget {
    Popup(u64),
    Indicator { id: i32, version: u64 },
}

/// Surface work decided under the state lock and issued after it is released.
enum SurfaceOp {
    AddTracker(ViewHandle, String),
    TrackerText(ViewHandle, String),
    AddIndicator(ViewHandle, String),
    IndicatorBadge(ViewHandle, Badge),
    PopupBadge(Badge),
    Remove(OverlayRegion, ViewHandle),
    Region(OverlayRegion, bool),
}

#[derive(Default)]
struct OverlayState {
    slot: SlotState,
    /// Bumped on every slot transition; a timer only acts if its epoch is still current.
    epoch: u64,
    queue: VecDeque<PopupContent>,
    popup_badge: u64,
    badge_seq: u64,
    view_seq: u64,
    trackers: Registry<TrackerEntry>,
    indicators: Registry<IndicatorEntry>,
    destroyed: bool,
}

impl OverlayState {
    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn next_badge(&mut self) -> u64 {
        self.badge_seq += 1;
        self.badge_seq
    }

    fn next_view(&mut self) -> ViewHandle {
        self.view_seq += 1;
        ViewHandle(self.view_seq)
    }
}

pub struct NotificationScheduler {
    surface: Arc<dyn OverlaySurface>,
    badges: Arc<dyn BadgeLoader>,
    ui: UiContext,
    timing: OverlayTiming,
    state: Mutex<OverlayState>,
    this: Weak<Self>,
}

impl NotificationScheduler {
    pub fn new(
        surface: Arc<dyn OverlaySurface>,
        badges: Arc<dyn BadgeLoader>,
        ui: UiContext,
        timing: OverlayTiming,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            surface,
            badges,
            ui,
            timing,
            state: Mutex::new(OverlayState::default()),
            this: this.clone(),
        })
    }

    // ========== Popup slot ==========

    /// Show `content` now if the slot is free, otherwise queue it behind earlier popups.
    pub fn enqueue(&self, content: PopupContent) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        if state.slot == SlotState::Hidden && state.queue.is_empty() {
            self.present(state, content);
        } else {
            state.queue.push_back(content);
            debug!("popup queued ({} waiting)", state.queue.len());
        }
    }

    /// Start dismissing the visible popup ahead of its display timer.
    pub fn dismiss_popup(&self) {
        let state = self.state.lock();
        if state.slot == SlotState::Showing {
            self.begin_dismiss(state);
        }
    }

    fn present(&self, mut state: MutexGuard<'_, OverlayState>, content: PopupContent) {
        state.slot = SlotState::Showing;
        let epoch = state.next_epoch();
        let badge_version = state.next_badge();
        state.popup_badge = badge_version;
        drop(state);

        self.surface.set_popup_badge(None);
        self.surface.show_popup(&content, self.timing.exit());
        if let Some(url) = content.badge_url {
            self.load_badge(url, BadgeTarget::Popup(badge_version));
        }
        self.after(self.timing.display(), move |s| s.on_display_elapsed(epoch));
    }

    fn on_display_elapsed(&self, epoch: u64) {
        let state = self.state.lock();
        if state.slot == SlotState::Showing && state.epoch == epoch {
            self.begin_dismiss(state);
        }
    }

    fn begin_dismiss(&self, mut state: MutexGuard<'_, OverlayState>) {
        state.slot = SlotState::Dismissing;
        let epoch = state.next_epoch();
        drop(state);

        self.surface.begin_popup_exit(self.timing.exit());
        self.after(self.timing.exit(), move |s| s.on_exit_elapsed(epoch));
    }

    fn on_exit_elapsed(&self, epoch: u64) {
        let mut state = self.state.lock();
        if state.slot != SlotState::Dismissing || state.epoch != epoch {
            return;
        }
        state.popup_badge = state.next_badge();
        let handoff = if state.queue.is_empty() {
            state.slot = SlotState::Hidden;
            None
        } else {
            state.slot = SlotState::Handoff;
            Some(state.next_epoch())
        };
        drop(state);

        self.surface.set_popup_badge(None);
        self.surface.hide_popup();
        if let Some(epoch) = handoff {
            self.after(self.timing.gap(), move |s| s.on_gap_elapsed(epoch));
        }
    }

    fn on_gap_elapsed(&self, epoch: u64) {
        let mut state = self.state.lock();
        if state.slot != SlotState::Handoff || state.epoch != epoch {
            return;
        }
        let next = state.queue.pop_front();
        match next {
            Some(next) => self.present(state, next),
            None => state.slot = SlotState::Hidden,
        }
    }

    /// Run `f` on the UI context after `delay`, unless the scheduler is gone by then.
    fn after<F>(&self, delay: Duration, f: F)
    where
        F: FnOnce(&NotificationScheduler) + Send + 'static,
    {
        let this = self.this.clone();
        self.ui.post_delayed(delay, move || {
            if let Some(scheduler) = this.upgrade() {
                f(&scheduler);
            }
        });
    }

    // ========== Leaderboard trackers ==========

    pub fn show_tracker(&self, id: i32, display: &str) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        let op = match state.trackers.get_mut(id) {
            Some(entry) => {
                entry.display = display.to_string();
                SurfaceOp::TrackerText(entry.view, display.to_string())
            }
            None => {
                let view = state.next_view();
                state.trackers.insert(
                    id,
                    TrackerEntry {
                        view,
                        display: display.to_string(),
                    },
                );
                SurfaceOp::AddTracker(view, display.to_string())
            }
        };
        let visible = state.trackers.visible();
        drop(state);

        self.apply(vec![op, SurfaceOp::Region(OverlayRegion::Trackers, visible)]);
    }

    /// Update an existing tracker's text. Unknown ids are ignored.
    pub fn update_tracker(&self, id: i32, display: &str) {
        let mut state = self.state.lock();
        let Some(entry) = state.trackers.get_mut(id) else {
            return;
        };
        entry.display = display.to_string();
        let view = entry.view;
        drop(state);

        self.apply(vec![SurfaceOp::TrackerText(view, display.to_string())]);
    }

    pub fn hide_tracker(&self, id: i32) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        let mut ops = Vec::with_capacity(2);
        if let Some(entry) = state.trackers.remove(id) {
            ops.push(SurfaceOp::Remove(OverlayRegion::Trackers, entry.view));
        }
        ops.push(SurfaceOp::Region(OverlayRegion::Trackers, state.trackers.visible()));
        drop(state);

        self.apply(ops);
    }

    // ========== Challenge indicators ==========

    pub fn show_indicator(&self, id: i32, title: &str, badge_url: &str) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        let version = state.next_badge();
        let mut ops = Vec::with_capacity(2);
        match state.indicators.get_mut(id) {
            Some(entry) => entry.badge_version = version,
            None => {
                let view = state.next_view();
                state.indicators.insert(
                    id,
                    IndicatorEntry {
                        view,
                        badge_version: version,
                    },
                );
                ops.push(SurfaceOp::AddIndicator(view, title.to_string()));
            }
        }
        ops.push(SurfaceOp::Region(OverlayRegion::Indicators, state.indicators.visible()));
        drop(state);

        self.apply(ops);
        if !badge_url.is_empty() {
            self.load_badge(badge_url.to_string(), BadgeTarget::Indicator { id, version });
        }
    }

    pub fn hide_indicator(&self, id: i32) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        let mut ops = Vec::with_capacity(2);
        if let Some(entry) = state.indicators.remove(id) {
            ops.push(SurfaceOp::Remove(OverlayRegion::Indicators, entry.view));
        }
        ops.push(SurfaceOp::Region(OverlayRegion::Indicators, state.indicators.visible()));
        drop(state);

        self.apply(ops);
    }

    fn apply(&self, ops: Vec<SurfaceOp>) {
        for op in ops {
            match op {
                SurfaceOp::AddTracker(view, display) => self.surface.add_tracker(view, &display),
                SurfaceOp::TrackerText(view, display) => {
                    self.surface.set_tracker_text(view, &display)
                }
                SurfaceOp::AddIndicator(view, title) => self.surface.add_indicator(view, &title),
                SurfaceOp::IndicatorBadge(view, badge) => {
                    self.surface.set_indicator_badge(view, &badge)
                }
                SurfaceOp::PopupBadge(badge) => self.surface.set_popup_badge(Some(&badge)),
                SurfaceOp::Remove(region, view) => self.surface.remove_view(region, view),
                SurfaceOp::Region(region, visible) => self.surface.set_region_visible(region, visible),
            }
        }
    }

    // ========== Badges ==========

    fn load_badge(&self, url: String, target: BadgeTarget) {
        let loader = Arc::clone(&self.badges);
        let this = self.this.clone();
        let ui = self.ui.clone();
        self.ui.runtime().spawn(async move {
            match loader.load(&url).await {
                Ok(badge) => {
                    ui.post(move || {
                        if let Some(scheduler) = this.upgrade() {
                            scheduler.apply_badge(target, badge);
                        }
                    });
                }
                Err(e) => debug!("badge load failed for {}: {}", redact_query(&url), e),
            }
        });
    }

    fn apply_badge(&self, target: BadgeTarget, badge: Badge) {
        let state = self.state.lock();
        if state.destroyed {
            return;
        }
        let op = match target {
            BadgeTarget::Popup(version) => {
                let visible = matches!(state.slot, SlotState::Showing | SlotState::Dismissing);
                if visible && state.popup_badge == version {
                    SurfaceOp::PopupBadge(badge)
                } else {
                    debug!("discarding stale popup badge (version {})", version);
                    return;
                }
            }
            BadgeTarget::Indicator { id, version } => match state.indicators.get(id) {
                Some(entry) if entry.badge_version == version => {
                    SurfaceOp::IndicatorBadge(entry.view, badge)
                }
                _ => {
                    debug!("discarding stale badge for indicator {}", id);
                    return;
                }
            },
        };
        drop(state);

        self.apply(vec![op]);
    }

    // ========== Teardown & inspection ==========

    /// Drop queued popups and every registry entry. Pending timers and loads become no-ops.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        let popup_visible = matches!(state.slot, SlotState::Showing | SlotState::Dismissing);
        state.slot = SlotState::Hidden;
        state.next_epoch();
        state.popup_badge = state.next_badge();
        state.queue.clear();

        let mut ops: Vec<SurfaceOp> = state
            .trackers
            .drain()
            .map(|(_, entry)| SurfaceOp::Remove(OverlayRegion::Trackers, entry.view))
            .collect();
        ops.extend(
            state
                .indicators
                .drain()
                .map(|(_, entry)| SurfaceOp::Remove(OverlayRegion::Indicators, entry.view)),
        );
        drop(state);

        ops.push(SurfaceOp::Region(OverlayRegion::Trackers, false));
        ops.push(SurfaceOp::Region(OverlayRegion::Indicators, false));
        self.apply(ops);
        if popup_visible {
            self.surface.hide_popup();
        }
        info!("notification overlay destroyed");
    }

    pub fn slot_state(&self) -> SlotState {
        self.state.lock().slot
    }

    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn tracker_count(&self) -> usize {
        self.state.lock().trackers.len()
    }

    pub fn indicator_count(&self) -> usize {
        self.state.lock().indicators.len()
    }
}

impl EventListener for NotificationScheduler {
    fn on_event(&self, event: &AchievementEvent) {
        use AchievementEvent::*;

        match event {
            AchievementTriggered {
                title,
                description,
                badge_url,
                points,
                ..
            } => self.enqueue(PopupContent::achievement(title, description, badge_url, *points)),
            AchievementProgressUpdated {
                title,
                measured_progress,
                measured_percent,
                ..
            } => self.enqueue(PopupContent::progress(title, measured_progress, *measured_percent)),
            AchievementProgressHidden => self.dismiss_popup(),
            GameCompleted { game_title } => self.enqueue(PopupContent::game_mastered(game_title)),
            SubsetCompleted { subset_title } => {
                self.enqueue(PopupContent::subset_mastered(subset_title))
            }
            GameSessionStarted {
                game_title,
                badge_url,
                num_achievements,
                num_unlocked,
            } => self.enqueue(PopupContent::now_playing(
                game_title,
                badge_url,
                *num_achievements,
                *num_unlocked,
            )),
            ChallengeIndicatorShow { id, title, badge_url } => {
                self.show_indicator(*id, title, badge_url)
            }
            ChallengeIndicatorHide { id } => self.hide_indicator(*id),
            LeaderboardStarted { title, description } => {
                self.enqueue(PopupContent::leaderboard_started(title, description))
            }
            LeaderboardFailed { title } => self.enqueue(PopupContent::leaderboard_failed(title)),
            LeaderboardSubmitted {
                title,
                score,
                new_rank,
                num_entries,
                ..
            } => self.enqueue(PopupContent::leaderboard_submitted(
                title,
                score,
                *new_rank,
                *num_entries,
            )),
            LeaderboardTrackerShow { tracker_id, display } => {
                self.show_tracker(*tracker_id, display)
            }
            LeaderboardTrackerUpdate { tracker_id, display } => {
                self.update_tracker(*tracker_id, display)
            }
            LeaderboardTrackerHide { tracker_id } => self.hide_tracker(*tracker_id),
            ServerError { .. } | ConnectionChanged { .. } | HardcoreReset => {}
        }
    }
}
