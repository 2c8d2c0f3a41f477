use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// Visible area the host reports for the page hosting the widget.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// UI flags shared by the submission pipeline and the chat window controller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewFlags {
    pub is_chat_window_open: bool,
    pub is_bot_typing: bool,
    pub is_scrolling: bool,
    pub text_area_sensitive_mode: bool,
    pub text_area_disabled: bool,
    pub input_length: usize,
    pub voice_toggled_on: bool,
    pub unread_count: usize,
    pub block_allows_attachment: bool,
    pub viewport: Viewport,
}

/// Owned state cell holding every flag twice: a snapshot for synchronous reads
/// inside async sequences, and a published copy for outside observers.
///
/// Both copies change under the same lock, so a reader of the snapshot never
/// sees a value the published side has not been sent yet, and vice versa.
pub struct ViewState {
    latest: Mutex<ViewFlags>,
    published: watch::Sender<ViewFlags>,
}

impl ViewState {
    pub fn new(initial: ViewFlags) -> Self {
        let (published, _) = watch::channel(initial.clone());
        Self {
            latest: Mutex::new(initial),
            published,
        }
    }

    /// Observable stream of flag changes for renderers and hosts.
    pub fn subscribe(&self) -> watch::Receiver<ViewFlags> {
        self.published.subscribe()
    }

    pub(crate) fn snapshot(&self) -> ViewFlags {
        self.lock().clone()
    }

    pub(crate) fn update<R>(&self, change: impl FnOnce(&mut ViewFlags) -> R) -> R {
        let mut latest = self.lock();
        let result = change(&mut latest);
        self.published.send_if_modified(|published| {
            if *published == *latest {
                return false;
            }
            *published = latest.clone();
            true
        });
        result
    }

    /// Flips the window state. Opening clears the unread counter in the same update.
    pub(crate) fn flip_chat_window(&self) -> bool {
        self.update(|flags| {
            flags.is_chat_window_open = !flags.is_chat_window_open;
            if flags.is_chat_window_open {
                flags.unread_count = 0;
            }
            flags.is_chat_window_open
        })
    }

    pub fn set_is_chat_window_open(&self, open: bool) {
        self.update(|flags| {
            if open && !flags.is_chat_window_open {
                flags.unread_count = 0;
            }
            flags.is_chat_window_open = open;
        });
    }

    pub fn set_is_bot_typing(&self, typing: bool) {
        self.update(|flags| flags.is_bot_typing = typing);
    }

    pub fn set_is_scrolling(&self, scrolling: bool) {
        self.update(|flags| flags.is_scrolling = scrolling);
    }

    pub fn set_text_area_sensitive_mode(&self, sensitive: bool) {
        self.update(|flags| flags.text_area_sensitive_mode = sensitive);
    }

    pub fn set_text_area_disabled(&self, disabled: bool) {
        self.update(|flags| flags.text_area_disabled = disabled);
    }

    pub fn set_input_length(&self, length: usize) {
        self.update(|flags| flags.input_length = length);
    }

    pub fn set_voice_toggled_on(&self, on: bool) {
        self.update(|flags| flags.voice_toggled_on = on);
    }

    pub fn set_block_allows_attachment(&self, allowed: bool) {
        self.update(|flags| flags.block_allows_attachment = allowed);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.update(|flags| flags.viewport = viewport);
    }

    pub(crate) fn bump_unread_count(&self) {
        self.update(|flags| flags.unread_count = flags.unread_count.saturating_add(1));
    }

    fn lock(&self) -> MutexGuard<'_, ViewFlags> {
        // Flags stay meaningful even if a panicking writer poisoned the lock.
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ViewFlags::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setter_updates_snapshot_and_published_value_together() {
        let state = ViewState::default();
        let observer = state.subscribe();

        state.set_is_bot_typing(true);

        assert!(state.snapshot().is_bot_typing);
        assert!(observer.borrow().is_bot_typing);
        assert!(observer.has_changed().expect("sender alive"));
    }

    #[test]
    fn opening_window_resets_unread_count_in_one_publish() {
        let state = ViewState::default();
        state.bump_unread_count();
        state.bump_unread_count();
        let mut observer = state.subscribe();
        observer.mark_unchanged();

        assert!(state.flip_chat_window());

        let published = observer.borrow_and_update().clone();
        assert!(published.is_chat_window_open);
        assert_eq!(published.unread_count, 0);
        assert!(!observer.has_changed().expect("sender alive"));
    }

    #[test]
    fn closing_window_keeps_unread_count() {
        let state = ViewState::new(ViewFlags {
            is_chat_window_open: true,
            ..ViewFlags::default()
        });

        assert!(!state.flip_chat_window());
        state.bump_unread_count();
        assert_eq!(state.snapshot().unread_count, 1);
    }

    #[test]
    fn unchanged_write_does_not_notify_observers() {
        let state = ViewState::default();
        let mut observer = state.subscribe();
        observer.mark_unchanged();

        state.set_input_length(0);

        assert!(!observer.has_changed().expect("sender alive"));
    }
}
