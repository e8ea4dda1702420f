use common::ErrorLocation;

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Errors raised while starting the external server.
///
/// Every variant is startup-fatal: the shell reports it and quits.
#[derive(Debug, ThisError)]
pub enum SupervisorError {
    #[error("Launcher Not Found Error: {message} {location}")]
    LauncherNotFound {
        message: String,
        searched: Vec<PathBuf>,
        location: ErrorLocation,
    },

    #[error("Entry Point Not Found Error: {message} {location}")]
    EntryPointNotFound {
        message: String,
        searched: Vec<PathBuf>,
        location: ErrorLocation,
    },

    #[error("Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Already Running Error: server PID {pid} is still supervised {location}")]
    AlreadyRunning { pid: u32, location: ErrorLocation },
}
