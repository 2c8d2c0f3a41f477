pub mod state;

pub use state::{
    BubbleSettings, ChatInputSettings, ChatWindowSettings, EventSettings, SensitiveInputSettings,
    Settings, SettingsError, SettingsStore, ToastSettings, VoiceSettings,
};
