use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::chat::events::{EventDispatcher, EventOutcome, RcbEventDetail};
use crate::chat::message::{Message, MessageContent, Sender};
use crate::error::WidgetResult;
use crate::ids::MessageId;
use crate::settings::{BubbleSettings, SettingsStore};
use crate::view_state::ViewState;

/// Ordered list of rendered messages.
///
/// Implementations may await rendering or animation before resolving. A
/// rejected write surfaces as `Err`; a write vetoed by a listener resolves to
/// `Ok(None)` / `Ok(false)`.
pub trait MessageStore: Send + Sync {
    fn inject_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>>;

    /// Renders `content` one character at a time.
    fn simulate_stream_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>>;

    /// Starts a stream for `sender`, or replaces the content of its active stream.
    fn stream_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>>;

    fn end_stream_message<'a>(&'a self, sender: Sender) -> BoxFuture<'a, WidgetResult<bool>>;

    fn remove_message<'a>(&'a self, id: MessageId)
    -> BoxFuture<'a, WidgetResult<Option<Message>>>;

    fn messages(&self) -> Vec<Message>;
}

#[derive(Default)]
struct StoreState {
    messages: Vec<Message>,
    streams: HashMap<Sender, MessageId>,
}

/// Message store kept in memory for one widget instance.
pub struct InMemoryMessageStore {
    settings: Arc<SettingsStore>,
    view_state: Arc<ViewState>,
    events: Arc<EventDispatcher>,
    state: Mutex<StoreState>,
    published: watch::Sender<Arc<[Message]>>,
}

impl InMemoryMessageStore {
    pub fn new(
        settings: Arc<SettingsStore>,
        view_state: Arc<ViewState>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        let (published, _) = watch::channel(Arc::from(Vec::new()));
        Self {
            settings,
            view_state,
            events,
            state: Mutex::new(StoreState::default()),
            published,
        }
    }

    /// Observable message list for renderers.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Message]>> {
        self.published.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &StoreState) {
        self.published
            .send_replace(Arc::from(state.messages.as_slice()));
    }

    fn bubble_settings(&self, sender: &Sender) -> BubbleSettings {
        let settings = self.settings.settings();
        if sender.is_user() {
            settings.user_bubble.clone()
        } else {
            settings.bot_bubble.clone()
        }
    }

    /// Runs the pre-inject veto and returns the message as listeners left it.
    async fn admit(&self, message: Message) -> Option<Message> {
        if !self.settings.settings().event.rcb_pre_inject_message {
            return Some(message);
        }

        match self
            .events
            .dispatch(RcbEventDetail::PreInjectMessage { message })
            .await
        {
            EventOutcome::Proceed(RcbEventDetail::PreInjectMessage { message }) => Some(message),
            _ => None,
        }
    }

    async fn announce_injected(&self, message: Message) {
        if self.settings.settings().event.rcb_post_inject_message {
            self.events
                .dispatch(RcbEventDetail::PostInjectMessage { message })
                .await;
        }
    }

    fn append(&self, message: Message) {
        let unread = !message.sender.is_user();
        {
            let mut state = self.lock();
            state.messages.push(message);
            self.publish(&state);
        }

        if unread && !self.view_state.snapshot().is_chat_window_open {
            self.view_state.bump_unread_count();
        }
    }

    /// Swaps the stored message with the same id. Returns false once it was removed.
    fn replace(&self, message: Message) -> bool {
        let mut state = self.lock();
        let Some(slot) = state
            .messages
            .iter_mut()
            .find(|existing| existing.id == message.id)
        else {
            return false;
        };
        *slot = message;
        self.publish(&state);
        true
    }

    fn find(&self, id: MessageId) -> Option<Message> {
        self.lock()
            .messages
            .iter()
            .find(|message| message.id == id)
            .cloned()
    }
}

impl MessageStore for InMemoryMessageStore {
    fn inject_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>> {
        Box::pin(async move {
            let Some(message) = self.admit(Message::new(content, sender)).await else {
                return Ok(None);
            };

            let id = message.id;
            tracing::debug!(sender = %message.sender, message_id = %id, "message injected");
            self.append(message.clone());
            self.announce_injected(message).await;
            Ok(Some(id))
        })
    }

    fn simulate_stream_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>> {
        Box::pin(async move {
            let Some(message) = self.admit(Message::new(content, sender)).await else {
                return Ok(None);
            };

            let id = message.id;
            let Some(full_text) = message.content.as_text().map(str::to_string) else {
                // Rich content has no characters to pace.
                self.append(message.clone());
                self.announce_injected(message).await;
                return Ok(Some(id));
            };

            let speed = self.bubble_settings(&message.sender).stream_speed();
            self.append(message.with_content(String::new()));

            let mut streamed = String::with_capacity(full_text.len());
            for character in full_text.chars() {
                tokio::time::sleep(speed).await;
                streamed.push(character);
                if !self.replace(message.with_content(streamed.clone())) {
                    tracing::debug!(message_id = %id, "simulated stream target removed");
                    return Ok(Some(id));
                }
            }

            self.announce_injected(message).await;
            Ok(Some(id))
        })
    }

    fn stream_message<'a>(
        &'a self,
        content: MessageContent,
        sender: Sender,
    ) -> BoxFuture<'a, WidgetResult<Option<MessageId>>> {
        Box::pin(async move {
            let active = self.lock().streams.get(&sender).copied();
            if let Some(id) = active
                && let Some(existing) = self.find(id)
                && self.replace(existing.with_content(content.clone()))
            {
                return Ok(Some(id));
            }

            let mut message = Message::new(content, sender);
            if self.settings.settings().event.rcb_start_stream_message {
                match self
                    .events
                    .dispatch(RcbEventDetail::StartStreamMessage { message })
                    .await
                    .into_detail()
                {
                    Some(RcbEventDetail::StartStreamMessage { message: admitted }) => {
                        message = admitted;
                    }
                    _ => return Ok(None),
                }
            }

            let id = message.id;
            tracing::debug!(sender = %message.sender, message_id = %id, "message stream started");
            self.lock().streams.insert(message.sender.clone(), id);
            self.append(message);
            Ok(Some(id))
        })
    }

    fn end_stream_message<'a>(&'a self, sender: Sender) -> BoxFuture<'a, WidgetResult<bool>> {
        Box::pin(async move {
            let Some(id) = self.lock().streams.get(&sender).copied() else {
                return Ok(false);
            };

            if self.settings.settings().event.rcb_stop_stream_message
                && let Some(message) = self.find(id)
                && self
                    .events
                    .dispatch(RcbEventDetail::StopStreamMessage { message })
                    .await
                    .is_suppressed()
            {
                return Ok(false);
            }

            self.lock().streams.remove(&sender);
            tracing::debug!(sender = %sender, message_id = %id, "message stream ended");
            Ok(true)
        })
    }

    fn remove_message<'a>(
        &'a self,
        id: MessageId,
    ) -> BoxFuture<'a, WidgetResult<Option<Message>>> {
        Box::pin(async move {
            let Some(message) = self.find(id) else {
                return Ok(None);
            };

            if self.settings.settings().event.rcb_remove_message
                && self
                    .events
                    .dispatch(RcbEventDetail::RemoveMessage { message })
                    .await
                    .is_suppressed()
            {
                return Ok(None);
            }

            let mut state = self.lock();
            let index = state.messages.iter().position(|message| message.id == id);
            let removed = index.map(|index| state.messages.remove(index));
            state.streams.retain(|_, stream_id| *stream_id != id);
            self.publish(&state);
            Ok(removed)
        })
    }

    fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }
}
