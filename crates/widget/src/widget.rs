use std::sync::Arc;

use snafu::ResultExt;

use crate::chat::{
    ChatWindowController, EventDispatcher, FrameScheduler, InMemoryMessageStore, InputBuffer,
    MessageStore, NoVoiceInput, SubmitController, TextArea, TextInput, ToastStore, TokioFrames,
    VoiceInput, VoiceSync,
};
use crate::error::{SettingsSnafu, WidgetResult};
use crate::flow::{BlockProcessor, Flow, FlowProcessor, PathNavigator};
use crate::settings::{Settings, SettingsStore};
use crate::view_state::{ViewFlags, ViewState};

/// State shared by every component of one widget instance.
#[derive(Clone)]
pub struct WidgetContext {
    pub settings: Arc<SettingsStore>,
    pub view_state: Arc<ViewState>,
    pub events: Arc<EventDispatcher>,
}

impl WidgetContext {
    pub fn new(settings: SettingsStore, flags: ViewFlags) -> Self {
        Self {
            settings: Arc::new(settings),
            view_state: Arc::new(ViewState::new(flags)),
            events: Arc::new(EventDispatcher::new()),
        }
    }
}

pub struct ChatBotBuilder {
    settings: SettingsStore,
    flow: Flow,
    flags: ViewFlags,
    text_input: Option<Arc<dyn TextInput>>,
    voice_input: Option<Arc<dyn VoiceInput>>,
    frames: Option<Arc<dyn FrameScheduler>>,
    messages: Option<Arc<dyn MessageStore>>,
}

impl ChatBotBuilder {
    pub fn initial_flags(mut self, flags: ViewFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn text_input(mut self, input: Arc<dyn TextInput>) -> Self {
        self.text_input = Some(input);
        self
    }

    pub fn voice_input(mut self, input: Arc<dyn VoiceInput>) -> Self {
        self.voice_input = Some(input);
        self
    }

    pub fn frames(mut self, frames: Arc<dyn FrameScheduler>) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Replaces the in-memory store, e.g. with one backed by the host's renderer.
    pub fn message_store(mut self, messages: Arc<dyn MessageStore>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn build(self) -> ChatBot {
        let context = WidgetContext::new(self.settings, self.flags);
        let messages = self.messages.unwrap_or_else(|| {
            Arc::new(InMemoryMessageStore::new(
                context.settings.clone(),
                context.view_state.clone(),
                context.events.clone(),
            ))
        });
        let navigator = Arc::new(PathNavigator::new(
            context.settings.clone(),
            context.events.clone(),
            self.flow,
        ));
        let processor: Arc<dyn BlockProcessor> = Arc::new(FlowProcessor::new(
            context.settings.clone(),
            context.view_state.clone(),
            messages.clone(),
            navigator.clone(),
        ));
        let text_area = Arc::new(TextArea::new(
            self.text_input
                .unwrap_or_else(|| Arc::new(InputBuffer::new())),
            context.settings.clone(),
            context.view_state.clone(),
            context.events.clone(),
        ));
        let voice = Arc::new(VoiceSync::new(
            context.settings.clone(),
            context.view_state.clone(),
            self.voice_input.unwrap_or_else(|| Arc::new(NoVoiceInput)),
        ));
        let window = ChatWindowController::new(
            context.settings.clone(),
            context.view_state.clone(),
            context.events.clone(),
            self.frames
                .unwrap_or_else(|| Arc::new(TokioFrames::default())),
        );
        let toasts = Arc::new(ToastStore::new(
            context.settings.clone(),
            context.events.clone(),
        ));
        let submit = SubmitController::new(
            context.clone(),
            text_area.clone(),
            messages.clone(),
            navigator.clone(),
            processor.clone(),
            voice.clone(),
        );

        ChatBot {
            context,
            messages,
            navigator,
            processor,
            text_area,
            voice,
            window,
            toasts,
            submit,
        }
    }
}

/// One embedded chatbot: its flow, message list, input and window.
pub struct ChatBot {
    context: WidgetContext,
    messages: Arc<dyn MessageStore>,
    navigator: Arc<PathNavigator>,
    processor: Arc<dyn BlockProcessor>,
    text_area: Arc<TextArea>,
    voice: Arc<VoiceSync>,
    window: ChatWindowController,
    toasts: Arc<ToastStore>,
    submit: SubmitController,
}

impl ChatBot {
    pub fn builder(settings: SettingsStore, flow: Flow) -> ChatBotBuilder {
        ChatBotBuilder {
            settings,
            flow,
            flags: ViewFlags::default(),
            text_input: None,
            voice_input: None,
            frames: None,
            messages: None,
        }
    }

    /// Enters `path` and shows its block. Returns false when navigation was refused.
    pub async fn start(&self, path: &str) -> WidgetResult<bool> {
        if !self.navigator.go_to_path(path).await {
            return Ok(false);
        }
        let Some(block) = self.navigator.block(path) else {
            return Ok(false);
        };

        self.processor.pre_process(path, &block).await?;
        self.context
            .view_state
            .set_text_area_disabled(block.chat_disabled);
        tracing::info!(path = %path, "chatbot started");
        Ok(true)
    }

    /// Applies and persists `change` on a copy of the current settings.
    pub fn update_settings(&self, change: impl FnOnce(&mut Settings)) -> WidgetResult<()> {
        let mut settings = Settings::clone(&self.context.settings.settings());
        change(&mut settings);
        self.context.settings.update(settings).context(SettingsSnafu {
            stage: "update-widget-settings",
        })
    }

    pub async fn handle_submit_text(&self, input_text: Option<&str>) -> WidgetResult<()> {
        self.submit.handle_submit_text(input_text).await
    }

    pub fn context(&self) -> &WidgetContext {
        &self.context
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.context.settings
    }

    pub fn view_state(&self) -> &Arc<ViewState> {
        &self.context.view_state
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.context.events
    }

    pub fn messages(&self) -> &Arc<dyn MessageStore> {
        &self.messages
    }

    pub fn navigator(&self) -> &Arc<PathNavigator> {
        &self.navigator
    }

    pub fn text_area(&self) -> &Arc<TextArea> {
        &self.text_area
    }

    pub fn voice(&self) -> &Arc<VoiceSync> {
        &self.voice
    }

    pub fn chat_window(&self) -> &ChatWindowController {
        &self.window
    }

    pub fn toasts(&self) -> &Arc<ToastStore> {
        &self.toasts
    }

    pub fn submit(&self) -> &SubmitController {
        &self.submit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{MessageContent, RcbEventDetail, Sender};
    use crate::flow::Block;

    fn demo_flow() -> Flow {
        Flow::from([
            (
                "start".to_string(),
                Block::new()
                    .with_message("What is your name?")
                    .with_path("greet"),
            ),
            (
                "greet".to_string(),
                Block::new()
                    .with_message("Nice to meet you.")
                    .with_path("start"),
            ),
        ])
    }

    fn bot_with(settings: Settings) -> ChatBot {
        ChatBot::builder(SettingsStore::in_memory(settings), demo_flow()).build()
    }

    fn texts(bot: &ChatBot) -> Vec<(Sender, String)> {
        bot.messages()
            .messages()
            .into_iter()
            .map(|message| {
                let text = match &message.content {
                    MessageContent::Text(text) => text.clone(),
                    MessageContent::Rich(value) => value.to_string(),
                };
                (message.sender, text)
            })
            .collect()
    }

    #[tokio::test]
    async fn start_shows_first_block() {
        let bot = bot_with(Settings::default());

        assert!(bot.start("start").await.expect("start"));

        assert_eq!(
            texts(&bot),
            vec![(Sender::Bot, "What is your name?".to_string())]
        );
        assert_eq!(bot.view_state().snapshot().unread_count, 1);
        assert!(!bot.start("missing").await.expect("start"));
    }

    #[tokio::test(start_paused = true)]
    async fn submission_walks_the_flow() {
        let bot = bot_with(Settings::default());
        bot.start("start").await.expect("start");
        bot.chat_window().toggle_chat_window(Some(true)).await;

        bot.handle_submit_text(Some("Ada")).await.expect("submit");

        assert_eq!(
            texts(&bot),
            vec![
                (Sender::Bot, "What is your name?".to_string()),
                (Sender::User, "Ada".to_string()),
                (Sender::Bot, "Nice to meet you.".to_string()),
            ]
        );
        assert_eq!(bot.navigator().paths(), vec!["start", "greet"]);
        assert_eq!(bot.view_state().snapshot().unread_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn text_field_feeds_submission() {
        let bot = bot_with(Settings::default());
        bot.start("start").await.expect("start");
        assert!(bot.text_area().set_text_area_value("Grace").await);
        assert_eq!(bot.view_state().snapshot().input_length, 5);

        bot.handle_submit_text(None).await.expect("submit");

        assert_eq!(bot.text_area().value(), "");
        assert_eq!(texts(&bot)[1], (Sender::User, "Grace".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn change_path_veto_keeps_conversation_in_place() {
        let mut settings = Settings::default();
        settings.event.rcb_change_path = true;
        let bot = bot_with(settings);
        bot.start("start").await.expect("start");
        bot.events().subscribe_fn(|event| {
            if matches!(event.detail(), RcbEventDetail::ChangePath { .. }) {
                event.prevent_default();
            }
        });

        bot.handle_submit_text(Some("Ada")).await.expect("submit");

        assert_eq!(bot.navigator().get_curr_path().as_deref(), Some("start"));
        assert_eq!(texts(&bot).len(), 2);
        assert!(!bot.view_state().snapshot().is_bot_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_answers_to_sensitive_block_stay_masked() {
        let flow = Flow::from([(
            "pin".to_string(),
            Block::new().with_message("PIN?").sensitive(),
        )]);
        let bot = ChatBot::builder(SettingsStore::in_memory(Settings::default()), flow).build();
        bot.start("pin").await.expect("start");

        bot.handle_submit_text(Some("1111")).await.expect("submit");
        bot.handle_submit_text(Some("2222")).await.expect("submit");

        let user_bubbles = texts(&bot)
            .into_iter()
            .filter(|(sender, _)| sender.is_user())
            .map(|(_, text)| text)
            .collect::<Vec<_>>();
        assert_eq!(user_bubbles, vec!["*".repeat(10), "*".repeat(10)]);
        assert!(bot.view_state().snapshot().text_area_sensitive_mode);
    }

    #[test]
    fn settings_update_is_visible_to_components() {
        let bot = bot_with(Settings::default());

        bot.update_settings(|settings| settings.chat_input.bot_delay = 5)
            .expect("in-memory update");

        assert_eq!(bot.settings().settings().chat_input.bot_delay, 5);
    }

    #[test]
    fn settings_update_failure_is_wrapped() {
        let root = std::env::temp_dir().join(format!("rcb-{}", crate::ids::MessageId::new_v7()));
        // A directory in place of the file makes the final rename fail.
        let config_path = root.join("settings.json");
        std::fs::create_dir_all(config_path.join("occupied")).expect("blocking dir");
        let bot = ChatBot::builder(SettingsStore::new(config_path), demo_flow()).build();

        let error = bot
            .update_settings(|settings| settings.voice.disabled = false)
            .expect_err("rename onto a directory fails");

        assert!(matches!(error, crate::error::WidgetError::Settings { .. }));
        std::fs::remove_dir_all(root).expect("cleanup");
    }
}
