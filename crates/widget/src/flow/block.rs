use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::WidgetResult;

/// Conversation graph keyed by path.
pub type Flow = HashMap<String, Block>;

/// What a block hook sees about the submission that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockParams {
    pub user_input: String,
    pub curr_path: Option<String>,
    pub prev_path: Option<String>,
}

pub type BlockFn = Arc<dyn Fn(BlockParams) -> BoxFuture<'static, WidgetResult<()>> + Send + Sync>;

type PathFn = Arc<dyn Fn(&BlockParams) -> Option<String> + Send + Sync>;

/// Where a block leads after the user answered it.
#[derive(Clone)]
pub enum BlockPath {
    Static(String),
    Dynamic(PathFn),
}

impl BlockPath {
    pub fn resolve(&self, params: &BlockParams) -> Option<String> {
        match self {
            Self::Static(path) => Some(path.clone()),
            Self::Dynamic(resolve) => resolve(params),
        }
    }
}

impl fmt::Debug for BlockPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(path) => formatter.debug_tuple("Static").field(path).finish(),
            Self::Dynamic(_) => formatter.write_str("Dynamic(..)"),
        }
    }
}

/// One bot-driven step of a conversation.
#[derive(Clone, Default)]
pub struct Block {
    pub message: Option<String>,
    pub path: Option<BlockPath>,
    pub function: Option<BlockFn>,
    pub is_sensitive: bool,
    pub chat_disabled: bool,
    pub allows_attachment: bool,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(BlockPath::Static(path.into()));
        self
    }

    pub fn with_dynamic_path<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&BlockParams) -> Option<String> + Send + Sync + 'static,
    {
        self.path = Some(BlockPath::Dynamic(Arc::new(resolve)));
        self
    }

    pub fn with_function<F>(mut self, function: F) -> Self
    where
        F: Fn(BlockParams) -> BoxFuture<'static, WidgetResult<()>> + Send + Sync + 'static,
    {
        self.function = Some(Arc::new(function));
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    pub fn chat_disabled(mut self) -> Self {
        self.chat_disabled = true;
        self
    }

    pub fn allows_attachment(mut self) -> Self {
        self.allows_attachment = true;
        self
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Block")
            .field("message", &self.message)
            .field("path", &self.path)
            .field("function", &self.function.as_ref().map(|_| ".."))
            .field("is_sensitive", &self.is_sensitive)
            .field("chat_disabled", &self.chat_disabled)
            .field("allows_attachment", &self.allows_attachment)
            .finish()
    }
}
