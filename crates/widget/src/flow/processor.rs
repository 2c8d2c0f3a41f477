use std::sync::Arc;

use futures::future::BoxFuture;

use crate::chat::message::Sender;
use crate::chat::store::MessageStore;
use crate::error::WidgetResult;
use crate::flow::block::{Block, BlockParams};
use crate::flow::navigator::PathNavigator;
use crate::settings::SettingsStore;
use crate::view_state::ViewState;

/// Rules applied when the conversation enters or leaves a block.
pub trait BlockProcessor: Send + Sync {
    /// Enters `block`: shows its message and applies its input flags.
    fn pre_process<'a>(&'a self, path: &'a str, block: &'a Block)
    -> BoxFuture<'a, WidgetResult<()>>;

    /// Leaves `block` after the user answered it. Resolves to true when the
    /// conversation moved to another path.
    fn post_process<'a>(
        &'a self,
        path: &'a str,
        block: Block,
        params: BlockParams,
    ) -> BoxFuture<'a, WidgetResult<bool>>;
}

/// Default processor: bot message on entry, function then path on exit.
pub struct FlowProcessor {
    settings: Arc<SettingsStore>,
    view_state: Arc<ViewState>,
    messages: Arc<dyn MessageStore>,
    navigator: Arc<PathNavigator>,
}

impl FlowProcessor {
    pub fn new(
        settings: Arc<SettingsStore>,
        view_state: Arc<ViewState>,
        messages: Arc<dyn MessageStore>,
        navigator: Arc<PathNavigator>,
    ) -> Self {
        Self {
            settings,
            view_state,
            messages,
            navigator,
        }
    }
}

impl BlockProcessor for FlowProcessor {
    fn pre_process<'a>(
        &'a self,
        path: &'a str,
        block: &'a Block,
    ) -> BoxFuture<'a, WidgetResult<()>> {
        Box::pin(async move {
            if let Some(message) = &block.message {
                let content = message.clone().into();
                if self.settings.settings().bot_bubble.simulate_stream {
                    self.messages
                        .simulate_stream_message(content, Sender::Bot)
                        .await?;
                } else {
                    self.messages.inject_message(content, Sender::Bot).await?;
                }
            }

            self.view_state
                .set_text_area_sensitive_mode(block.is_sensitive);
            self.view_state
                .set_block_allows_attachment(block.allows_attachment);
            tracing::debug!(path = %path, sensitive = block.is_sensitive, "entered block");
            Ok(())
        })
    }

    fn post_process<'a>(
        &'a self,
        path: &'a str,
        block: Block,
        params: BlockParams,
    ) -> BoxFuture<'a, WidgetResult<bool>> {
        Box::pin(async move {
            let Some(block) = self.navigator.fire_post_process_block_event(path, block).await
            else {
                return Ok(false);
            };

            if let Some(function) = &block.function {
                function(params.clone()).await?;
            }

            let Some(next_path) = block.path.as_ref().and_then(|next| next.resolve(&params))
            else {
                return Ok(false);
            };

            Ok(self.navigator.go_to_path(&next_path).await)
        })
    }
}
