use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "rcb";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const DEFAULT_BOT_DELAY_MS: u64 = 1000;
pub const DEFAULT_ASTERISKS_COUNT: usize = 10;
pub const DEFAULT_STREAM_SPEED_MS: u64 = 30;
pub const DEFAULT_MAX_TOAST_COUNT: usize = 3;

/// Toggles for the cancellable lifecycle events. Every event is off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventSettings {
    pub rcb_user_submit_text: bool,
    pub rcb_toggle_chat_window: bool,
    pub rcb_pre_inject_message: bool,
    pub rcb_post_inject_message: bool,
    pub rcb_remove_message: bool,
    pub rcb_start_stream_message: bool,
    pub rcb_stop_stream_message: bool,
    pub rcb_change_path: bool,
    pub rcb_post_process_block: bool,
    pub rcb_show_toast: bool,
    pub rcb_dismiss_toast: bool,
    pub rcb_text_area_change_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatInputSettings {
    /// Pause between a user submission and the bot's block processing, in ms.
    pub bot_delay: u64,
    pub character_limit: Option<usize>,
    pub block_spam: bool,
}

impl Default for ChatInputSettings {
    fn default() -> Self {
        Self {
            bot_delay: DEFAULT_BOT_DELAY_MS,
            character_limit: None,
            block_spam: true,
        }
    }
}

impl ChatInputSettings {
    pub fn bot_delay(&self) -> Duration {
        Duration::from_millis(self.bot_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensitiveInputSettings {
    pub hide_in_user_bubble: bool,
    pub mask_in_user_bubble: bool,
    pub asterisks_count: usize,
}

impl Default for SensitiveInputSettings {
    fn default() -> Self {
        Self {
            hide_in_user_bubble: false,
            mask_in_user_bubble: true,
            asterisks_count: DEFAULT_ASTERISKS_COUNT,
        }
    }
}

impl SensitiveInputSettings {
    pub fn mask(&self) -> String {
        "*".repeat(self.asterisks_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BubbleSettings {
    pub simulate_stream: bool,
    /// Delay between streamed characters, in ms.
    pub stream_speed: u64,
}

impl Default for BubbleSettings {
    fn default() -> Self {
        Self {
            simulate_stream: false,
            stream_speed: DEFAULT_STREAM_SPEED_MS,
        }
    }
}

impl BubbleSettings {
    pub fn stream_speed(&self) -> Duration {
        Duration::from_millis(self.stream_speed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatWindowSettings {
    pub auto_jump_to_bottom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToastSettings {
    pub max_count: usize,
    pub forbid_on_max: bool,
    pub dismiss_on_click: bool,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_TOAST_COUNT,
            forbid_on_max: false,
            dismiss_on_click: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoiceSettings {
    pub disabled: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self { disabled: true }
    }
}

/// Widget configuration, read through `Arc` snapshots and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub event: EventSettings,
    pub chat_input: ChatInputSettings,
    pub sensitive_input: SensitiveInputSettings,
    pub user_bubble: BubbleSettings,
    pub bot_bubble: BubbleSettings,
    pub chat_window: ChatWindowSettings,
    pub toast: ToastSettings,
    pub voice: VoiceSettings,
}

impl Settings {
    pub fn normalized(mut self) -> Self {
        // A zero limit would make every keystroke a no-op.
        if self.chat_input.character_limit == Some(0) {
            self.chat_input.character_limit = None;
        }
        if self.toast.max_count == 0 {
            self.toast.max_count = DEFAULT_MAX_TOAST_COUNT;
        }

        self
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<Settings>>,
    config_path: Option<PathBuf>,
}

impl SettingsStore {
    /// Per-user config directory, or a relative `rcb` directory when the platform has none.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join(SETTINGS_DIRECTORY_NAME)
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path: Some(config_path),
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    /// Builds a store that never touches the filesystem.
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings.normalized())),
            config_path: None,
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn update(&self, settings: Settings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        if let Some(path) = &self.config_path {
            Self::persist(path, &normalized_settings)?;
        }
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> Settings {
        if !path.is_file() {
            tracing::info!(path = %path.display(), "no widget settings file, starting from defaults");
            return Settings::default();
        }

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Json::file(path))
            .extract::<Settings>()
            .map(Settings::normalized)
            .unwrap_or_else(|error| {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "ignoring unreadable widget settings file"
                );
                Settings::default()
            })
    }

    /// Writes the settings next to `path` first, then swaps the file into place.
    fn persist(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(directory) = path.parent() {
            std::fs::create_dir_all(directory).context(PrepareDirectorySnafu {
                stage: "prepare-directory",
                directory: directory.to_path_buf(),
            })?;
        }

        let json = serde_json::to_vec_pretty(settings).context(EncodeSnafu {
            stage: "encode-json",
        })?;

        let staged = path.with_extension("json.tmp");
        std::fs::write(&staged, json).context(StageSnafu {
            stage: "stage-file",
            staged: staged.clone(),
        })?;
        std::fs::rename(&staged, path).context(SwapSnafu {
            stage: "swap-file",
            staged,
            target: path.to_path_buf(),
        })?;

        tracing::info!(path = %path.display(), "widget settings saved");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot prepare widget settings directory {} ({stage}): {source}", directory.display()))]
    PrepareDirectory {
        stage: &'static str,
        directory: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("widget settings are not representable as json ({stage}): {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot stage widget settings at {} ({stage}): {source}", staged.display()))]
    Stage {
        stage: &'static str,
        staged: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "cannot move staged widget settings {} over {} ({stage}): {source}",
        staged.display(),
        target.display()
    ))]
    Swap {
        stage: &'static str,
        staged: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_file_overrides_only_named_fields() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{
                    "event": { "rcbUserSubmitText": true },
                    "chatInput": { "botDelay": 5 },
                    "sensitiveInput": { "asterisksCount": 4 }
                }"#,
            )?;

            let store = SettingsStore::new(jail.directory().join(SETTINGS_FILE_NAME));
            let settings = store.settings();
            assert!(settings.event.rcb_user_submit_text);
            assert!(!settings.event.rcb_toggle_chat_window);
            assert_eq!(settings.chat_input.bot_delay, 5);
            assert!(settings.chat_input.block_spam);
            assert_eq!(settings.sensitive_input.mask(), "****");
            assert!(settings.sensitive_input.mask_in_user_bubble);
            Ok(())
        });
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE_NAME, "{ not json")?;

            let store = SettingsStore::new(jail.directory().join(SETTINGS_FILE_NAME));
            assert_eq!(*store.settings(), Settings::default());
            Ok(())
        });
    }

    #[test]
    fn update_persists_and_swaps_snapshot() {
        figment::Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join(SETTINGS_FILE_NAME);
            let store = SettingsStore::new(path.clone());
            let before = store.settings();

            let mut next = Settings::default();
            next.user_bubble.simulate_stream = true;
            next.chat_input.character_limit = Some(0);
            store.update(next).expect("persist settings");

            assert!(!before.user_bubble.simulate_stream);
            assert!(store.settings().user_bubble.simulate_stream);
            assert_eq!(store.settings().chat_input.character_limit, None);

            assert!(!path.with_extension("json.tmp").exists());
            let reloaded = SettingsStore::new(path);
            assert!(reloaded.settings().user_bubble.simulate_stream);
            Ok(())
        });
    }

    #[test]
    fn update_keeps_snapshot_when_directory_cannot_be_prepared() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("blocker", "not a directory")?;
            let store = SettingsStore::new(jail.directory().join("blocker").join(SETTINGS_FILE_NAME));

            let mut next = Settings::default();
            next.voice.disabled = false;
            let error = store.update(next).expect_err("parent is a file");

            assert!(matches!(error, SettingsError::PrepareDirectory { stage: "prepare-directory", .. }));
            assert!(store.settings().voice.disabled);
            Ok(())
        });
    }

    #[test]
    fn in_memory_store_has_no_path() {
        let store = SettingsStore::in_memory(Settings::default());
        assert!(store.config_path().is_none());
        store.update(Settings::default()).expect("in-memory update");
    }
}
