#![deny(unsafe_code)]

/// Headless core of an embeddable chatbot widget.
///
/// Hosts supply the text field, chat surface, frame ticks and speech
/// recognizer through traits; the crate owns the submission pipeline, the
/// flow navigation and the observable view state.
pub mod chat;
pub mod error;
pub mod flow;
pub mod ids;
/// Widget configuration and its JSON persistence.
pub mod settings;
pub mod view_state;
pub mod widget;

pub use error::{WidgetError, WidgetResult};
pub use ids::{MessageId, ToastId};
pub use settings::{Settings, SettingsError, SettingsStore};
pub use view_state::{ViewFlags, ViewState, Viewport};
pub use widget::{ChatBot, ChatBotBuilder, WidgetContext};
