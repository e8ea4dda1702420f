use crate::error::prefs::PrefsError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BridgeError {
    /// The page asked for the port before the handshake completed.
    #[error("Server Not Ready Error {location}")]
    NotReady { location: ErrorLocation },

    #[error(transparent)]
    Prefs(#[from] PrefsError),
}

impl BridgeError {
    #[track_caller]
    pub fn not_ready() -> Self {
        BridgeError::NotReady {
            location: ErrorLocation::caller(),
        }
    }
}
