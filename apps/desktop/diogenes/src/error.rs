use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the desktop shell and returned from Tauri commands.
///
/// Serialized as `{"type": ..., "data": {...}}` so pages get structured
/// failures rather than opaque strings.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum DiogenesError {
    /// Error from this App
    #[error("Diogenes Error: {message} {location}")]
    Diogenes {
        message: String,
        location: ErrorLocation,
    },

    /// Error from client-core (supervisor, handshake, stores)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A bridge request the shell could not answer
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },

    #[error("Window Error: {message} {location}")]
    Window {
        message: String,
        location: ErrorLocation,
    },
}

impl DiogenesError {
    #[track_caller]
    pub fn diogenes(message: impl Into<String>) -> Self {
        DiogenesError::Diogenes {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn core(message: impl Into<String>) -> Self {
        DiogenesError::Core {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn bridge(message: impl Into<String>) -> Self {
        DiogenesError::Bridge {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn window(message: impl Into<String>) -> Self {
        DiogenesError::Window {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}
