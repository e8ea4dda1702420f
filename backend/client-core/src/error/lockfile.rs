use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LockFileError {
    #[error("Lock File Read Error: {path}: {source} {location}")]
    Read {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    /// Contents present but missing `port`/`pid`, or not valid in either format.
    #[error("Lock File Parse Error: {reason} {location}")]
    Parse {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Lock File Remove Error: {path}: {source} {location}")]
    Remove {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },
}

impl LockFileError {
    #[track_caller]
    pub fn parse(reason: impl Into<String>) -> Self {
        LockFileError::Parse {
            reason: reason.into(),
            location: ErrorLocation::caller(),
        }
    }
}
