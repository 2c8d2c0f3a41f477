use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::BoxFuture;

use crate::chat::message::Message;
use crate::chat::toast::Toast;
use crate::flow::Block;

/// Lifecycle event names as seen by listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcbEventKind {
    UserSubmitText,
    ToggleChatWindow,
    PreInjectMessage,
    PostInjectMessage,
    RemoveMessage,
    StartStreamMessage,
    StopStreamMessage,
    ChangePath,
    PostProcessBlock,
    ShowToast,
    DismissToast,
    TextAreaChangeValue,
}

impl RcbEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserSubmitText => "rcb-user-submit-text",
            Self::ToggleChatWindow => "rcb-toggle-chat-window",
            Self::PreInjectMessage => "rcb-pre-inject-message",
            Self::PostInjectMessage => "rcb-post-inject-message",
            Self::RemoveMessage => "rcb-remove-message",
            Self::StartStreamMessage => "rcb-start-stream-message",
            Self::StopStreamMessage => "rcb-stop-stream-message",
            Self::ChangePath => "rcb-change-path",
            Self::PostProcessBlock => "rcb-post-process-block",
            Self::ShowToast => "rcb-show-toast",
            Self::DismissToast => "rcb-dismiss-toast",
            Self::TextAreaChangeValue => "rcb-text-area-change-value",
        }
    }
}

/// Event payload. Listeners may rewrite fields; the dispatching operation reads them back.
#[derive(Debug, Clone)]
pub enum RcbEventDetail {
    UserSubmitText {
        input_text: String,
        send_in_chat: bool,
    },
    ToggleChatWindow {
        curr_state: bool,
        new_state: bool,
    },
    PreInjectMessage {
        message: Message,
    },
    PostInjectMessage {
        message: Message,
    },
    RemoveMessage {
        message: Message,
    },
    StartStreamMessage {
        message: Message,
    },
    StopStreamMessage {
        message: Message,
    },
    ChangePath {
        curr_path: Option<String>,
        prev_path: Option<String>,
        next_path: String,
    },
    PostProcessBlock {
        path: String,
        block: Block,
    },
    ShowToast {
        toast: Toast,
    },
    DismissToast {
        toast: Toast,
    },
    TextAreaChangeValue {
        curr_value: String,
        prev_value: String,
    },
}

impl RcbEventDetail {
    pub fn kind(&self) -> RcbEventKind {
        match self {
            Self::UserSubmitText { .. } => RcbEventKind::UserSubmitText,
            Self::ToggleChatWindow { .. } => RcbEventKind::ToggleChatWindow,
            Self::PreInjectMessage { .. } => RcbEventKind::PreInjectMessage,
            Self::PostInjectMessage { .. } => RcbEventKind::PostInjectMessage,
            Self::RemoveMessage { .. } => RcbEventKind::RemoveMessage,
            Self::StartStreamMessage { .. } => RcbEventKind::StartStreamMessage,
            Self::StopStreamMessage { .. } => RcbEventKind::StopStreamMessage,
            Self::ChangePath { .. } => RcbEventKind::ChangePath,
            Self::PostProcessBlock { .. } => RcbEventKind::PostProcessBlock,
            Self::ShowToast { .. } => RcbEventKind::ShowToast,
            Self::DismissToast { .. } => RcbEventKind::DismissToast,
            Self::TextAreaChangeValue { .. } => RcbEventKind::TextAreaChangeValue,
        }
    }
}

/// A cancellable notification handed to every listener in registration order.
#[derive(Debug, Clone)]
pub struct RcbEvent {
    detail: RcbEventDetail,
    default_prevented: bool,
}

impl RcbEvent {
    pub fn new(detail: RcbEventDetail) -> Self {
        Self {
            detail,
            default_prevented: false,
        }
    }

    pub fn kind(&self) -> RcbEventKind {
        self.detail.kind()
    }

    pub fn detail(&self) -> &RcbEventDetail {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut RcbEventDetail {
        &mut self.detail
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Result of dispatching an event.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// No listener vetoed; carries the detail as listeners left it.
    Proceed(RcbEventDetail),
    Suppressed,
}

impl EventOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    pub fn into_detail(self) -> Option<RcbEventDetail> {
        match self {
            Self::Proceed(detail) => Some(detail),
            Self::Suppressed => None,
        }
    }
}

pub trait RcbEventListener: Send + Sync {
    fn on_event<'a>(&'a self, event: &'a mut RcbEvent) -> BoxFuture<'a, ()>;
}

struct FnListener<F>(F);

impl<F> RcbEventListener for FnListener<F>
where
    F: Fn(&mut RcbEvent) + Send + Sync,
{
    fn on_event<'a>(&'a self, event: &'a mut RcbEvent) -> BoxFuture<'a, ()> {
        (self.0)(event);
        Box::pin(async {})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans lifecycle events out to external listeners and reports whether any vetoed.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn RcbEventListener>)>>,
    next_listener_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn RcbEventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Registers a synchronous listener closure.
    pub fn subscribe_fn<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut RcbEvent) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnListener(listener)))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub async fn dispatch(&self, detail: RcbEventDetail) -> EventOutcome {
        // Listeners may subscribe or unsubscribe while being awaited.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();

        let mut event = RcbEvent::new(detail);
        for listener in listeners {
            listener.on_event(&mut event).await;
        }

        if event.default_prevented() {
            tracing::debug!(event = event.kind().as_str(), "event default prevented");
            EventOutcome::Suppressed
        } else {
            EventOutcome::Proceed(event.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn submit_detail(text: &str) -> RcbEventDetail {
        RcbEventDetail::UserSubmitText {
            input_text: text.to_string(),
            send_in_chat: true,
        }
    }

    #[tokio::test]
    async fn no_listeners_proceeds_with_original_detail() {
        let dispatcher = EventDispatcher::new();
        let outcome = dispatcher.dispatch(submit_detail("hi")).await;

        match outcome {
            EventOutcome::Proceed(RcbEventDetail::UserSubmitText { input_text, .. }) => {
                assert_eq!(input_text, "hi")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn any_listener_can_suppress_and_later_listeners_still_run() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        dispatcher.subscribe_fn(|event| event.prevent_default());
        let log = seen.clone();
        dispatcher.subscribe_fn(move |event| {
            log.lock().expect("log").push(event.default_prevented());
        });

        assert!(dispatcher.dispatch(submit_detail("hi")).await.is_suppressed());
        assert_eq!(*seen.lock().expect("log"), vec![true]);
    }

    #[tokio::test]
    async fn listener_rewrites_are_returned() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe_fn(|event| {
            if let RcbEventDetail::UserSubmitText { send_in_chat, .. } = event.detail_mut() {
                *send_in_chat = false;
            }
        });

        let detail = dispatcher
            .dispatch(submit_detail("hi"))
            .await
            .into_detail()
            .expect("not suppressed");
        assert!(matches!(
            detail,
            RcbEventDetail::UserSubmitText {
                send_in_chat: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unsubscribed_listener_is_not_called() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.subscribe_fn(|event| event.prevent_default());

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        assert!(!dispatcher.dispatch(submit_detail("hi")).await.is_suppressed());
    }

    #[test]
    fn kind_names_match_wire_constants() {
        assert_eq!(
            submit_detail("x").kind().as_str(),
            "rcb-user-submit-text"
        );
    }
}
