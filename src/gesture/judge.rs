use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use log::trace;
use tokio::{sync::Mutex, task::JoinHandle, time};

use super::state::{JudgeState, TapKind};
use super::PointerEvent;

/// Projects a raw pointer event into map ratios; evaluated at press time so
/// the episode reports the contact point under the rotation/scale that was
/// current when the finger went down.
pub type RatioFn = Arc<dyn Fn(&PointerEvent) -> (f64, f64) + Send + Sync>;

/// Receives the terminal classification of an episode.
pub type OnTapFn = Arc<dyn Fn(TapKind, f64, f64) + Send + Sync>;

/// Judgment thresholds.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// How long after the first contact the episode is classified.
    pub tap_window: Duration,
    /// Displacement beyond which the episode is treated as a pan, not a tap.
    pub move_tolerance_px: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            tap_window: Duration::from_millis(250),
            move_tolerance_px: 5.0,
        }
    }
}

/// Classifies one surface's pointer stream into single / double / long taps.
///
/// All entry points are fire-and-forget; the classification arrives through
/// the `on_tap` callback when the judgment window closes. One judge serves one
/// surface: a second concurrent press is the double-tap signal, never an
/// independent episode.
#[derive(Clone)]
pub struct TapJudge {
    state: Arc<Mutex<JudgeState>>,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    episodes: Arc<AtomicU64>,
    get_ratio: RatioFn,
    on_tap: OnTapFn,
    config: JudgeConfig,
}

impl TapJudge {
    pub fn new(get_ratio: RatioFn, on_tap: OnTapFn, config: JudgeConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(JudgeState::new())),
            timer: Arc::new(Mutex::new(None)),
            episodes: Arc::new(AtomicU64::new(1)),
            get_ratio,
            on_tap,
            config,
        }
    }

    pub async fn pointer_down(&self, ev: &PointerEvent) {
        let episode = {
            let mut state = self.state.lock().await;
            if state.is_judging() {
                state.mark_second_down();
                return;
            }
            let episode = self.episodes.fetch_add(1, Ordering::Relaxed);
            let (x_ratio, y_ratio) = (self.get_ratio)(ev);
            state.begin_episode(episode, ev.client_x, ev.client_y, x_ratio, y_ratio);
            episode
        };
        trace!("episode {episode} opened at ({}, {})", ev.client_x, ev.client_y);
        self.arm_timer(episode).await;
    }

    pub async fn pointer_move(&self, ev: &PointerEvent) {
        let mut state = self.state.lock().await;
        state.mark_moved_if_beyond(ev.client_x, ev.client_y, self.config.move_tolerance_px);
    }

    pub async fn pointer_up(&self, _ev: &PointerEvent) {
        let mut state = self.state.lock().await;
        state.mark_released();
    }

    /// Cancels any pending judgment and returns to idle without firing.
    /// Called when the owning surface is torn down; after this returns the
    /// episode's timer can never deliver a callback.
    pub async fn dispose(&self) {
        let mut timer = self.timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        self.state.lock().await.reset();
    }

    async fn arm_timer(&self, episode: u64) {
        let mut timer = self.timer.lock().await;
        // A previous episode's timer only lingers here after dispose() raced
        // with its expiry; it is dead either way.
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let on_tap = self.on_tap.clone();
        let window = self.config.tap_window;

        let handle = tokio::spawn(async move {
            time::sleep(window).await;

            let fired = {
                let mut guard = state.lock().await;
                if guard.episode() != Some(episode) {
                    return;
                }
                let fired = match (guard.classify(), guard.ratio()) {
                    (Some(kind), Some((x_ratio, y_ratio))) => Some((kind, x_ratio, y_ratio)),
                    _ => None,
                };
                guard.reset();
                fired
            };

            // Lock released before the callback so a handler may immediately
            // start the next episode on this same judge.
            if let Some((kind, x_ratio, y_ratio)) = fired {
                trace!("episode {episode} resolved as {}", kind.as_str());
                on_tap(kind, x_ratio, y_ratio);
            } else {
                trace!("episode {episode} suppressed (moved beyond tolerance)");
            }
        });

        *timer = Some(handle);
    }
}
