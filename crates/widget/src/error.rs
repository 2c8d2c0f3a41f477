use snafu::Snafu;

use crate::settings::SettingsError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WidgetError {
    #[snafu(display("message store rejected a '{sender}' message on `{stage}`: {details}"))]
    MessageRejected {
        stage: &'static str,
        sender: String,
        details: String,
    },
    #[snafu(display("block '{path}' failed on `{stage}`: {details}"))]
    BlockFailed {
        stage: &'static str,
        path: String,
        details: String,
    },
    #[snafu(display("settings update failed on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
}

pub type WidgetResult<T> = Result<T, WidgetError>;
