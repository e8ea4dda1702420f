use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HandshakeError {
    #[error("Watch Error: cannot watch {path}: {message} {location}")]
    Watch {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
        #[source]
        source: notify::Error,
    },

    #[error("Handshake Already Started Error {location}")]
    AlreadyStarted { location: ErrorLocation },
}
