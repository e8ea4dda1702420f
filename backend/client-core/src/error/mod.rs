pub mod bridge;
pub mod config;
pub mod handshake;
pub mod lockfile;
pub mod prefs;
pub mod session;
pub mod supervisor;
pub mod window_state;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    LockFile(#[from] lockfile::LockFileError),

    #[error(transparent)]
    Prefs(#[from] prefs::PrefsError),

    #[error(transparent)]
    WindowState(#[from] window_state::WindowStateError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Supervisor(#[from] supervisor::SupervisorError),

    #[error(transparent)]
    Handshake(#[from] handshake::HandshakeError),

    #[error(transparent)]
    Session(#[from] session::SessionError),

    #[error(transparent)]
    Bridge(#[from] bridge::BridgeError),
}
