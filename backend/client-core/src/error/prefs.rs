use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PrefsError {
    #[error("Preferences Read Error: {path}: {source} {location}")]
    Read {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences Write Error: {path}: {source} {location}")]
    Write {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown Database Error: '{name}' {location}")]
    UnknownDatabase {
        name: String,
        location: ErrorLocation,
    },

    #[error("Invalid Font Error: {reason} {location}")]
    InvalidFont {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Invalid Location Error: {reason} {location}")]
    InvalidLocation {
        reason: String,
        location: ErrorLocation,
    },
}
