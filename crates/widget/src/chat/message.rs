use std::fmt;
use std::time::SystemTime;

use crate::ids::MessageId;

/// Who a message bubble belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
    System,
    Custom(String),
}

impl Sender {
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "USER",
            Self::Bot => "BOT",
            Self::System => "SYSTEM",
            Self::Custom(tag) => tag,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<&str> for Sender {
    fn from(tag: &str) -> Self {
        match tag {
            "USER" => Self::User,
            "BOT" => Self::Bot,
            "SYSTEM" => Self::System,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Bubble body: plain text, or a rich element description the renderer understands.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Rich(serde_json::Value),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Rich(_) => None,
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<serde_json::Value> for MessageContent {
    fn from(value: serde_json::Value) -> Self {
        Self::Rich(value)
    }
}

/// One rendered message. Updates replace the whole value rather than mutating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub content: MessageContent,
    pub sender: Sender,
    pub timestamp: SystemTime,
}

impl Message {
    pub fn new(content: impl Into<MessageContent>, sender: Sender) -> Self {
        Self {
            id: MessageId::new_v7(),
            content: content.into(),
            sender,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_content(&self, content: impl Into<MessageContent>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}
