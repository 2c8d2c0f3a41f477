use std::sync::{Arc, Mutex, PoisonError};

use crate::chat::events::{EventDispatcher, RcbEventDetail};
use crate::settings::SettingsStore;
use crate::view_state::ViewState;

/// Host binding for the text field the user types into.
pub trait TextInput: Send + Sync {
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
}

/// Text field kept in memory, for hosts without a native input.
#[derive(Default)]
pub struct InputBuffer {
    value: Mutex<String>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextInput for InputBuffer {
    fn value(&self) -> String {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_value(&self, value: &str) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.to_string();
    }
}

/// Writes to the text field while keeping the tracked input length in step.
pub struct TextArea {
    input: Arc<dyn TextInput>,
    settings: Arc<SettingsStore>,
    view_state: Arc<ViewState>,
    events: Arc<EventDispatcher>,
}

impl TextArea {
    pub fn new(
        input: Arc<dyn TextInput>,
        settings: Arc<SettingsStore>,
        view_state: Arc<ViewState>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            input,
            settings,
            view_state,
            events,
        }
    }

    pub fn value(&self) -> String {
        self.input.value()
    }

    /// Empties the field. Allowed even while the text area is disabled.
    pub fn clear(&self) {
        self.input.set_value("");
        self.view_state.set_input_length(0);
    }

    /// Sets the field value, truncated to the configured character limit.
    ///
    /// Returns false when a listener vetoed the change, or when the text area is
    /// disabled and `value` is not empty.
    pub async fn set_text_area_value(&self, value: &str) -> bool {
        if self.view_state.snapshot().text_area_disabled && !value.is_empty() {
            return false;
        }

        let settings = self.settings.settings();
        let mut value = match settings.chat_input.character_limit {
            Some(limit) => value.chars().take(limit).collect::<String>(),
            None => value.to_string(),
        };

        if settings.event.rcb_text_area_change_value {
            match self
                .events
                .dispatch(RcbEventDetail::TextAreaChangeValue {
                    curr_value: value,
                    prev_value: self.input.value(),
                })
                .await
                .into_detail()
            {
                Some(RcbEventDetail::TextAreaChangeValue { curr_value, .. }) => value = curr_value,
                _ => return false,
            }
        }

        self.input.set_value(&value);
        self.view_state.set_input_length(value.chars().count());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn text_area(settings: Settings) -> (TextArea, Arc<InputBuffer>, Arc<ViewState>) {
        let input = Arc::new(InputBuffer::new());
        let view_state = Arc::new(ViewState::default());
        let text_area = TextArea::new(
            input.clone(),
            Arc::new(SettingsStore::in_memory(settings)),
            view_state.clone(),
            Arc::new(EventDispatcher::new()),
        );
        (text_area, input, view_state)
    }

    #[tokio::test]
    async fn value_is_truncated_to_character_limit() {
        let mut settings = Settings::default();
        settings.chat_input.character_limit = Some(3);
        let (text_area, input, view_state) = text_area(settings);

        assert!(text_area.set_text_area_value("héllo").await);

        assert_eq!(input.value(), "hél");
        assert_eq!(view_state.snapshot().input_length, 3);
    }

    #[tokio::test]
    async fn disabled_text_area_ignores_writes_but_clears() {
        let (text_area, input, view_state) = text_area(Settings::default());
        assert!(text_area.set_text_area_value("draft").await);
        view_state.set_text_area_disabled(true);

        assert!(!text_area.set_text_area_value("other").await);
        assert_eq!(input.value(), "draft");

        assert!(text_area.set_text_area_value("").await);
        assert_eq!(input.value(), "");
        text_area.clear();
        assert_eq!(view_state.snapshot().input_length, 0);
    }
}
