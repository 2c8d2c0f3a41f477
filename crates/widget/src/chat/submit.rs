use std::sync::Arc;

use crate::chat::events::RcbEventDetail;
use crate::chat::message::Sender;
use crate::chat::store::MessageStore;
use crate::chat::text_area::TextArea;
use crate::chat::voice::VoiceSync;
use crate::error::WidgetResult;
use crate::flow::{BlockParams, BlockProcessor, PathNavigator};
use crate::widget::WidgetContext;

/// Turns a user submission into a rendered bubble and a flow step.
pub struct SubmitController {
    context: WidgetContext,
    text_area: Arc<TextArea>,
    messages: Arc<dyn MessageStore>,
    navigator: Arc<PathNavigator>,
    processor: Arc<dyn BlockProcessor>,
    voice: Arc<VoiceSync>,
}

impl SubmitController {
    pub fn new(
        context: WidgetContext,
        text_area: Arc<TextArea>,
        messages: Arc<dyn MessageStore>,
        navigator: Arc<PathNavigator>,
        processor: Arc<dyn BlockProcessor>,
        voice: Arc<VoiceSync>,
    ) -> Self {
        Self {
            context,
            text_area,
            messages,
            navigator,
            processor,
            voice,
        }
    }

    /// Submits `input_text`, or the text field's value when `None`.
    ///
    /// Vetoed, pathless and blank submissions end quietly with `Ok(())`.
    pub async fn handle_submit_text(&self, input_text: Option<&str>) -> WidgetResult<()> {
        let mut input_text = match input_text {
            Some(text) => text.to_string(),
            None => self.text_area.value(),
        };
        let mut send_in_chat = true;

        if self.context.settings.settings().event.rcb_user_submit_text {
            let detail = RcbEventDetail::UserSubmitText {
                input_text,
                send_in_chat,
            };
            match self.context.events.dispatch(detail).await.into_detail() {
                Some(RcbEventDetail::UserSubmitText {
                    input_text: text,
                    send_in_chat: show,
                }) => {
                    input_text = text;
                    send_in_chat = show;
                }
                _ => {
                    tracing::debug!("submission vetoed by listener");
                    return Ok(());
                }
            }
        }

        let Some(path) = self.navigator.get_curr_path() else {
            tracing::debug!("submission ignored without a current path");
            return Ok(());
        };

        let text = input_text.trim();
        if text.is_empty() {
            return Ok(());
        }

        self.text_area.clear();
        if send_in_chat {
            self.send_user_input(text).await?;
        }

        self.handle_action_input(&path, text).await
    }

    /// Renders the user's bubble, masked or hidden in sensitive mode.
    pub async fn send_user_input(&self, text: &str) -> WidgetResult<()> {
        let settings = self.context.settings.settings();
        let displayed = if self.context.view_state.snapshot().text_area_sensitive_mode {
            if settings.sensitive_input.hide_in_user_bubble {
                return Ok(());
            }
            if settings.sensitive_input.mask_in_user_bubble {
                settings.sensitive_input.mask()
            } else {
                text.to_string()
            }
        } else {
            text.to_string()
        };

        if settings.user_bubble.simulate_stream {
            self.messages
                .simulate_stream_message(displayed.into(), Sender::User)
                .await?;
        } else {
            self.messages
                .inject_message(displayed.into(), Sender::User)
                .await?;
        }
        Ok(())
    }

    /// Hands the real text to the block at `path` and enters the next block.
    ///
    /// Input flags are restored from the current block even when the block
    /// fails; the failure is still returned.
    pub async fn handle_action_input(&self, path: &str, text: &str) -> WidgetResult<()> {
        let settings = self.context.settings.settings();
        let voice_was_on = self.context.view_state.snapshot().voice_toggled_on;
        self.voice.sync_voice(false);

        self.context.view_state.update(|flags| {
            if settings.chat_input.block_spam {
                flags.text_area_disabled = true;
            }
            flags.text_area_sensitive_mode = false;
            flags.block_allows_attachment = false;
        });

        tokio::time::sleep(settings.chat_input.bot_delay()).await;
        self.context.view_state.set_is_bot_typing(true);

        let result = self.advance(path, text).await;

        // Whether or not the flow moved, input flags follow the block now current.
        let current = self
            .navigator
            .get_curr_path()
            .and_then(|curr| self.navigator.block(&curr))
            .unwrap_or_default();
        self.context.view_state.update(|flags| {
            flags.is_bot_typing = false;
            flags.text_area_disabled = current.chat_disabled;
            flags.text_area_sensitive_mode = current.is_sensitive;
            flags.block_allows_attachment = current.allows_attachment;
        });
        if voice_was_on {
            self.voice.sync_voice(true);
        }

        if let Err(error) = &result {
            tracing::warn!(path = %path, error = %error, "block processing failed");
        }
        result
    }

    async fn advance(&self, path: &str, text: &str) -> WidgetResult<()> {
        let Some(block) = self.navigator.block(path) else {
            tracing::warn!(path = %path, "current path has no block");
            return Ok(());
        };

        let params = BlockParams {
            user_input: text.to_string(),
            curr_path: Some(path.to_string()),
            prev_path: self.navigator.get_prev_path(),
        };
        if !self.processor.post_process(path, block, params).await? {
            return Ok(());
        }

        let Some(next_path) = self.navigator.get_curr_path() else {
            return Ok(());
        };
        if let Some(next_block) = self.navigator.block(&next_path) {
            self.processor.pre_process(&next_path, &next_block).await?;
        }
        Ok(())
    }
}
