use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Window Error: {label}: {message} {location}")]
    Window {
        label: String,
        message: String,
        location: ErrorLocation,
    },
}

impl SessionError {
    #[track_caller]
    pub fn window(label: impl Into<String>, message: impl Into<String>) -> Self {
        SessionError::Window {
            label: label.into(),
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}
