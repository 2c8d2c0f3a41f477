use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::chat::events::{EventDispatcher, RcbEventDetail};
use crate::ids::ToastId;
use crate::settings::SettingsStore;

/// Ephemeral notification shown over the chat window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub timeout: Option<Duration>,
}

impl Toast {
    pub fn new(message: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            id: ToastId::new_v7(),
            message: message.into(),
            timeout,
        }
    }
}

pub struct ToastStore {
    settings: Arc<SettingsStore>,
    events: Arc<EventDispatcher>,
    toasts: Mutex<Vec<Toast>>,
    published: watch::Sender<Vec<Toast>>,
}

impl ToastStore {
    pub fn new(settings: Arc<SettingsStore>, events: Arc<EventDispatcher>) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            settings,
            events,
            toasts: Mutex::new(Vec::new()),
            published,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.published.subscribe()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().clone()
    }

    /// Shows a toast, evicting the oldest one at capacity unless the settings forbid it.
    ///
    /// With a timeout, the toast dismisses itself on the tokio runtime.
    pub async fn show_toast(
        self: &Arc<Self>,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Option<ToastId> {
        let settings = self.settings.settings();
        if settings.toast.forbid_on_max && self.lock().len() >= settings.toast.max_count {
            tracing::debug!(max_count = settings.toast.max_count, "toast refused at capacity");
            return None;
        }

        let mut toast = Toast::new(message, timeout);
        if settings.event.rcb_show_toast {
            match self
                .events
                .dispatch(RcbEventDetail::ShowToast { toast })
                .await
                .into_detail()
            {
                Some(RcbEventDetail::ShowToast { toast: admitted }) => toast = admitted,
                _ => return None,
            }
        }

        let id = toast.id;
        let timeout = toast.timeout;
        {
            let mut toasts = self.lock();
            // Another toast may have filled the last slot while the event was out.
            if settings.toast.forbid_on_max && toasts.len() >= settings.toast.max_count {
                tracing::debug!(max_count = settings.toast.max_count, "toast refused at capacity");
                return None;
            }
            while toasts.len() >= settings.toast.max_count {
                toasts.remove(0);
            }
            toasts.push(toast);
            self.published.send_replace(toasts.clone());
        }

        if let Some(timeout) = timeout {
            let store = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                store.dismiss_toast(id).await;
            });
        }

        Some(id)
    }

    pub async fn dismiss_toast(&self, id: ToastId) -> bool {
        let Some(toast) = self.lock().iter().find(|toast| toast.id == id).cloned() else {
            return false;
        };

        if self.settings.settings().event.rcb_dismiss_toast
            && self
                .events
                .dispatch(RcbEventDetail::DismissToast { toast })
                .await
                .is_suppressed()
        {
            return false;
        }

        let mut toasts = self.lock();
        let before = toasts.len();
        toasts.retain(|toast| toast.id != id);
        let removed = toasts.len() != before;
        if removed {
            self.published.send_replace(toasts.clone());
        }
        removed
    }

    /// Host click on a toast. Dismisses it unless click dismissal is turned off.
    pub async fn click_toast(&self, id: ToastId) -> bool {
        if !self.settings.settings().toast.dismiss_on_click {
            return false;
        }
        self.dismiss_toast(id).await
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
