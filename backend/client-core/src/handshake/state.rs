use crate::lockfile::LockFileRecord;

use common::is_not_found;

use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use notify::EventKind;

/// Why a startup handshake failed. Every variant is startup-fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// The lock file appeared but did not hold both `port` and `pid`.
    Corrupt { reason: String },
    /// No usable lock file within the configured timeout.
    TimedOut { after: Duration },
    /// The server process ended before it wrote a lock file.
    ServerExited { status: String },
}

impl Display for HandshakeFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Corrupt { reason } => write!(f, "server lock file is corrupt: {reason}"),
            Self::TimedOut { after } => {
                write!(f, "server did not start within {}s", after.as_secs())
            }
            Self::ServerExited { status } => {
                write!(f, "server exited before it was ready ({status})")
            }
        }
    }
}

pub type HandshakeOutcome = Result<LockFileRecord, HandshakeFailure>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandshakeState {
    #[default]
    Idle,
    Watching,
    Ready(LockFileRecord),
    Failed(HandshakeFailure),
}

impl HandshakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Ready(_) | HandshakeState::Failed(_))
    }

    pub fn outcome(&self) -> Option<HandshakeOutcome> {
        match self {
            HandshakeState::Ready(record) => Some(Ok(*record)),
            HandshakeState::Failed(failure) => Some(Err(failure.clone())),
            HandshakeState::Idle | HandshakeState::Watching => None,
        }
    }

    pub fn record(&self) -> Option<LockFileRecord> {
        match self {
            HandshakeState::Ready(record) => Some(*record),
            _ => None,
        }
    }
}

/// The handshake state machine, free of any watching machinery.
///
/// Every input returns `Some(outcome)` only on the one transition into a
/// terminal state; after that every input is ignored.
#[derive(Debug)]
pub struct Handshake {
    lock_path: PathBuf,
    file_name: OsString,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        let lock_path = lock_path.into();
        let file_name = lock_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        Self {
            lock_path,
            file_name,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// `Idle -> Watching`. Returns false if watching already began.
    pub fn begin(&mut self) -> bool {
        if self.state != HandshakeState::Idle {
            return false;
        }
        debug!("Handshake watching for {}", self.lock_path.display());
        self.state = HandshakeState::Watching;
        true
    }

    fn finish(&mut self, outcome: HandshakeOutcome) -> Option<HandshakeOutcome> {
        if self.state != HandshakeState::Watching {
            return None;
        }

        self.state = match &outcome {
            Ok(record) => {
                info!(
                    "Server ready on port {} (PID {})",
                    record.port, record.pid
                );
                HandshakeState::Ready(*record)
            }
            Err(failure) => {
                error!("Server handshake failed: {failure}");
                HandshakeState::Failed(failure.clone())
            }
        };
        Some(outcome)
    }

    /// Feed a directory change notification.
    pub fn on_fs_event(&mut self, kind: &EventKind, paths: &[PathBuf]) -> Option<HandshakeOutcome> {
        if self.state != HandshakeState::Watching {
            return None;
        }

        if !matches!(kind, EventKind::Create(_) | EventKind::Modify(_)) {
            trace!("Ignoring {kind:?} event");
            return None;
        }

        let ours = paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == self.file_name));
        if !ours {
            trace!("Ignoring event for {paths:?}");
            return None;
        }

        self.probe()
    }

    /// Read the lock file and transition if it is complete.
    ///
    /// A file that is absent, empty or momentarily unreadable keeps us
    /// watching; the server may still be writing it. Bytes that are not
    /// UTF-8 never become a record, so they fail the handshake.
    pub fn probe(&mut self) -> Option<HandshakeOutcome> {
        if self.state != HandshakeState::Watching {
            return None;
        }

        let contents = match fs::read_to_string(&self.lock_path) {
            Ok(contents) => contents,
            Err(e) if is_not_found(&e) => {
                debug!("Lock file event but no lock file yet");
                return None;
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return self.finish(Err(HandshakeFailure::Corrupt {
                    reason: format!("lock file is not valid UTF-8: {e}"),
                }));
            }
            Err(e) => {
                warn!("Lock file not readable yet: {e}");
                return None;
            }
        };

        if contents.trim().is_empty() {
            debug!("Lock file exists but is still empty");
            return None;
        }

        let outcome = LockFileRecord::parse(&contents).map_err(|e| HandshakeFailure::Corrupt {
            reason: e.to_string(),
        });
        self.finish(outcome)
    }

    pub fn on_timeout(&mut self, after: Duration) -> Option<HandshakeOutcome> {
        self.finish(Err(HandshakeFailure::TimedOut { after }))
    }

    pub fn on_server_exit(&mut self, status: impl Into<String>) -> Option<HandshakeOutcome> {
        // The server may have written the file just before exiting.
        if let Some(outcome) = self.probe() {
            return Some(outcome);
        }
        self.finish(Err(HandshakeFailure::ServerExited {
            status: status.into(),
        }))
    }
}
