use std::sync::Arc;

use crate::settings::SettingsStore;
use crate::view_state::ViewState;

/// Host speech recognizer. Only start/stop are driven from here.
pub trait VoiceInput: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Recognizer for hosts without voice support.
pub struct NoVoiceInput;

impl VoiceInput for NoVoiceInput {
    fn start(&self) {}
    fn stop(&self) {}
}

pub struct VoiceSync {
    settings: Arc<SettingsStore>,
    view_state: Arc<ViewState>,
    input: Arc<dyn VoiceInput>,
}

impl VoiceSync {
    pub fn new(
        settings: Arc<SettingsStore>,
        view_state: Arc<ViewState>,
        input: Arc<dyn VoiceInput>,
    ) -> Self {
        Self {
            settings,
            view_state,
            input,
        }
    }

    /// Starts or stops recognition. Ignored while voice is disabled or the window is closed.
    pub fn sync_voice(&self, active: bool) {
        if self.settings.settings().voice.disabled
            || !self.view_state.snapshot().is_chat_window_open
        {
            return;
        }

        if active {
            self.input.start();
        } else {
            self.input.stop();
        }
        self.view_state.set_voice_toggled_on(active);
    }

    pub fn toggle_voice(&self) {
        let on = self.view_state.snapshot().voice_toggled_on;
        self.sync_voice(!on);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::settings::Settings;
    use crate::view_state::ViewFlags;

    #[derive(Default)]
    struct RecordingVoice {
        calls: Mutex<Vec<&'static str>>,
    }

    impl VoiceInput for RecordingVoice {
        fn start(&self) {
            self.calls.lock().expect("calls").push("start");
        }

        fn stop(&self) {
            self.calls.lock().expect("calls").push("stop");
        }
    }

    fn voice(disabled: bool, open: bool) -> (VoiceSync, Arc<RecordingVoice>, Arc<ViewState>) {
        let mut settings = Settings::default();
        settings.voice.disabled = disabled;
        let view_state = Arc::new(ViewState::new(ViewFlags {
            is_chat_window_open: open,
            ..ViewFlags::default()
        }));
        let recorder = Arc::new(RecordingVoice::default());
        let sync = VoiceSync::new(
            Arc::new(SettingsStore::in_memory(settings)),
            view_state.clone(),
            recorder.clone(),
        );
        (sync, recorder, view_state)
    }

    #[test]
    fn toggling_drives_recognizer_and_flag() {
        let (sync, recorder, view_state) = voice(false, true);

        sync.toggle_voice();
        assert!(view_state.snapshot().voice_toggled_on);
        sync.toggle_voice();
        assert!(!view_state.snapshot().voice_toggled_on);

        assert_eq!(*recorder.calls.lock().expect("calls"), vec!["start", "stop"]);
    }

    #[test]
    fn disabled_voice_or_closed_window_is_ignored() {
        for (disabled, open) in [(true, true), (false, false)] {
            let (sync, recorder, view_state) = voice(disabled, open);
            sync.sync_voice(true);
            assert!(recorder.calls.lock().expect("calls").is_empty());
            assert!(!view_state.snapshot().voice_toggled_on);
        }
    }
}
