/// Cancellable lifecycle events and their dispatcher.
pub mod events;
pub mod message;
/// Rendered message list and its streaming operations.
pub mod store;
pub mod submit;
pub mod text_area;
pub mod toast;
pub mod voice;
/// Open/close, typing indicator and scroll animation of the chat window.
pub mod window;

pub use events::{
    EventDispatcher, EventOutcome, ListenerId, RcbEvent, RcbEventDetail, RcbEventKind,
    RcbEventListener,
};
pub use message::{Message, MessageContent, Sender};
pub use store::{InMemoryMessageStore, MessageStore};
pub use submit::SubmitController;
pub use text_area::{InputBuffer, TextArea, TextInput};
pub use toast::{Toast, ToastStore};
pub use voice::{NoVoiceInput, VoiceInput, VoiceSync};
pub use window::{
    ChatSurface, ChatWindowController, FrameScheduler, Rect, ScrollAnimation, ScrollHandle,
    TokioFrames, ease_in_out_quad,
};
