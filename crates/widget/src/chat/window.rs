use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::chat::events::{EventDispatcher, RcbEventDetail};
use crate::settings::SettingsStore;
use crate::view_state::{ViewState, Viewport};

/// Simulated time advanced by each animation frame, in ms.
pub const SCROLL_STEP_MS: f64 = 20.0;
/// Frame pacing of [`TokioFrames`] when no interval is given.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Bounding box of the chat body in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Rect {
    pub fn fits_within(&self, viewport: Viewport) -> bool {
        self.top >= 0.0
            && self.left >= 0.0
            && self.bottom <= viewport.height
            && self.right <= viewport.width
    }
}

/// The mounted chat body the host renders messages into.
pub trait ChatSurface: Send + Sync {
    fn bounding_rect(&self) -> Rect;
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&self, offset: f64);
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
}

/// Source of animation frame ticks.
pub trait FrameScheduler: Send + Sync {
    fn next_frame(&self) -> BoxFuture<'static, ()>;
}

/// Frame ticks from the tokio timer.
pub struct TokioFrames {
    interval: Duration,
}

impl TokioFrames {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for TokioFrames {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameScheduler for TokioFrames {
    fn next_frame(&self) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(self.interval))
    }
}

/// Quadratic ease-in-out: start `b`, change `c`, duration `d`, at time `t`.
pub fn ease_in_out_quad(t: f64, b: f64, c: f64, d: f64) -> f64 {
    let mut t = t / (d / 2.0);
    if t < 1.0 {
        return c / 2.0 * t * t + b;
    }
    t -= 1.0;
    -c / 2.0 * (t * (t - 2.0) - 1.0) + b
}

/// Scroll animation progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAnimation {
    Idle,
    Animating {
        start: f64,
        change: f64,
        elapsed_ms: f64,
        duration_ms: f64,
    },
    Done,
}

impl ScrollAnimation {
    pub fn new(start: f64, end: f64, duration: Duration) -> Self {
        let duration_ms = duration.as_secs_f64() * 1000.0;
        if duration_ms <= 0.0 {
            return Self::Idle;
        }

        Self::Animating {
            start,
            change: end - start,
            elapsed_ms: 0.0,
            duration_ms,
        }
    }

    /// Advances one frame and returns the offset to apply.
    pub fn step(&mut self) -> Option<f64> {
        let Self::Animating {
            start,
            change,
            elapsed_ms,
            duration_ms,
        } = *self
        else {
            return None;
        };

        // The last frame lands exactly on the duration so the offset reaches the end.
        let elapsed_ms = (elapsed_ms + SCROLL_STEP_MS).min(duration_ms);
        let offset = ease_in_out_quad(elapsed_ms, start, change, duration_ms);
        *self = if elapsed_ms < duration_ms {
            Self::Animating {
                start,
                change,
                elapsed_ms,
                duration_ms,
            }
        } else {
            Self::Done
        };
        Some(offset)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Cancellation flag checked by a running scroll animation at every frame.
#[derive(Debug, Clone, Default)]
pub struct ScrollToken(Arc<AtomicBool>);

impl ScrollToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Handle to a running scroll animation.
pub struct ScrollHandle {
    token: ScrollToken,
    task: JoinHandle<()>,
}

impl ScrollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits until the animation finished or stopped.
    pub async fn finished(self) {
        if let Err(error) = self.task.await {
            tracing::warn!(error = %error, "scroll animation task failed");
        }
    }
}

struct MountedSurface(Arc<dyn ChatSurface>);

/// Open/close, typing indicator, visibility and scrolling of the chat window.
pub struct ChatWindowController {
    settings: Arc<SettingsStore>,
    view_state: Arc<ViewState>,
    events: Arc<EventDispatcher>,
    surface: Arc<ArcSwapOption<MountedSurface>>,
    frames: Arc<dyn FrameScheduler>,
    /// Token of the animation that owns `is_scrolling`.
    active_scroll: Arc<Mutex<Option<ScrollToken>>>,
}

impl ChatWindowController {
    pub fn new(
        settings: Arc<SettingsStore>,
        view_state: Arc<ViewState>,
        events: Arc<EventDispatcher>,
        frames: Arc<dyn FrameScheduler>,
    ) -> Self {
        Self {
            settings,
            view_state,
            events,
            surface: Arc::new(ArcSwapOption::empty()),
            frames,
            active_scroll: Arc::new(Mutex::new(None)),
        }
    }

    pub fn mount_surface(&self, surface: Arc<dyn ChatSurface>) {
        self.surface.store(Some(Arc::new(MountedSurface(surface))));
    }

    pub fn unmount_surface(&self) {
        self.surface.store(None);
        self.cancel_scroll();
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.view_state.set_viewport(Viewport::new(width, height));
    }

    pub fn is_chat_window_open(&self) -> bool {
        self.view_state.snapshot().is_chat_window_open
    }

    /// Opens or closes the window; `None` flips it.
    pub async fn toggle_chat_window(&self, active: Option<bool>) {
        let current = self.view_state.snapshot().is_chat_window_open;
        if active == Some(current) {
            return;
        }

        if self.settings.settings().event.rcb_toggle_chat_window {
            let detail = RcbEventDetail::ToggleChatWindow {
                curr_state: current,
                new_state: !current,
            };
            if self.events.dispatch(detail).await.is_suppressed() {
                return;
            }
        }

        let open = self.view_state.flip_chat_window();
        tracing::debug!(open, "chat window toggled");

        if open && self.settings.settings().chat_window.auto_jump_to_bottom {
            self.scroll_to_bottom(Duration::ZERO);
        }
    }

    /// Shows or hides the typing indicator; `None` flips it.
    pub fn toggle_is_bot_typing(&self, active: Option<bool>) {
        self.view_state.update(|flags| {
            if active != Some(flags.is_bot_typing) {
                flags.is_bot_typing = !flags.is_bot_typing;
            }
        });
    }

    /// True when the mounted chat body lies entirely inside the viewport.
    pub fn get_is_chat_bot_visible(&self) -> bool {
        let Some(surface) = self.surface.load_full() else {
            return false;
        };

        surface
            .0
            .bounding_rect()
            .fits_within(self.view_state.snapshot().viewport)
    }

    /// Scrolls the chat body to its end, animated when `duration` is non-zero.
    ///
    /// A new request cancels the animation still running from a previous one.
    pub fn scroll_to_bottom(&self, duration: Duration) -> Option<ScrollHandle> {
        let surface = self.surface.load_full()?;
        self.cancel_scroll();

        let end = surface.0.scroll_height() - surface.0.client_height();
        let mut animation = ScrollAnimation::new(surface.0.scroll_top(), end, duration);
        let Some(offset) = animation.step() else {
            surface.0.set_scroll_top(end);
            self.view_state.set_is_scrolling(false);
            return None;
        };

        surface.0.set_scroll_top(offset);
        if animation.is_done() {
            self.view_state.set_is_scrolling(false);
            return None;
        }

        let token = ScrollToken::default();
        {
            let mut active = lock_scroll(&self.active_scroll);
            *active = Some(token.clone());
            self.view_state.set_is_scrolling(true);
        }

        let task = tokio::spawn(Self::drive_scroll(
            animation,
            token.clone(),
            self.surface.clone(),
            self.frames.clone(),
            self.view_state.clone(),
            self.active_scroll.clone(),
        ));
        Some(ScrollHandle { token, task })
    }

    /// Stops the running animation, if any, and clears `is_scrolling`.
    pub fn cancel_scroll(&self) {
        let mut active = lock_scroll(&self.active_scroll);
        if let Some(token) = active.take() {
            token.cancel();
            self.view_state.set_is_scrolling(false);
        }
    }

    async fn drive_scroll(
        mut animation: ScrollAnimation,
        token: ScrollToken,
        surface: Arc<ArcSwapOption<MountedSurface>>,
        frames: Arc<dyn FrameScheduler>,
        view_state: Arc<ViewState>,
        active: Arc<Mutex<Option<ScrollToken>>>,
    ) {
        loop {
            frames.next_frame().await;
            if token.is_cancelled() {
                break;
            }
            let Some(surface) = surface.load_full() else {
                tracing::debug!("chat surface unmounted during scroll");
                break;
            };

            if let Some(offset) = animation.step() {
                surface.0.set_scroll_top(offset);
            }
            if animation.is_done() {
                break;
            }
        }

        let mut owner = lock_scroll(&active);
        match owner.as_ref() {
            // A newer animation owns the flag.
            Some(current) if !current.same(&token) => {}
            _ => {
                *owner = None;
                view_state.set_is_scrolling(false);
            }
        }
    }
}

fn lock_scroll(active: &Mutex<Option<ScrollToken>>) -> MutexGuard<'_, Option<ScrollToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}
