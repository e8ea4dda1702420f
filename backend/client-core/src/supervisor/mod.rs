//! Lifecycle of the external CGI server process.
//!
//! Exactly one server is supervised per application run:
//!
//! 1. [`ServerSupervisor::cleanup_stale`] removes a lock file left by an
//!    uncleanly terminated run and signals the pid it names
//! 2. [`ServerSupervisor::start`] spawns `<interpreter> <entry point>` with
//!    stdout/stderr forwarded to the log
//! 3. [`ServerSupervisor::stop`] terminates the child and deletes the lock file

pub mod launcher;
pub mod process;

pub use launcher::{Launch, LauncherSearch, Platform};
pub use process::{StaleKill, terminate_stale};

use crate::CONFIG_DIR_ENV;
use crate::error::supervisor::SupervisorError;
use crate::lockfile;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child as TokioChild, Command as TokioCommand};
use tokio::spawn as TokioSpawn;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Log target for everything the server prints.
pub const SERVER_LOG_TARGET: &str = "diogenes::server";

const GRACEFUL_EXIT_WAIT: Duration = Duration::from_secs(3);
const STOP_WAIT: Duration = Duration::from_secs(5);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// What stale cleanup found before a new server was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleCleanup {
    NoLockFile,
    Removed { pid: Option<u32>, kill: Option<StaleKill> },
}

/// Owned handle to the spawned server.
///
/// A background task owns the [`TokioChild`]; the handle talks to it through
/// a kill channel and observes the exit status it publishes exactly once.
pub struct ServerHandle {
    pid: u32,
    exit_rx: watch::Receiver<Option<ExitStatus>>,
    kill_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status, once the process has exited.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit_rx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Receiver that flips to `Some(status)` when the process exits.
    pub fn exit_watch(&self) -> watch::Receiver<Option<ExitStatus>> {
        self.exit_rx.clone()
    }
}

pub struct ServerSupervisor {
    settings_dir: PathBuf,
    search: LauncherSearch,
    handle: Option<ServerHandle>,
}

impl ServerSupervisor {
    pub fn new(settings_dir: impl Into<PathBuf>, search: LauncherSearch) -> Self {
        Self {
            settings_dir: settings_dir.into(),
            search,
            handle: None,
        }
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn lock_file_path(&self) -> PathBuf {
        lockfile::lock_file_path(&self.settings_dir)
    }

    pub fn handle(&self) -> Option<&ServerHandle> {
        self.handle.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.has_exited())
    }

    /// Remove a lock file left behind by a previous run.
    ///
    /// The pid it records is signalled best-effort; the file is deleted
    /// whether or not that worked.
    pub async fn cleanup_stale(&self) -> StaleCleanup {
        let lock_path = self.lock_file_path();

        if !lock_path.exists() {
            debug!("No stale lock file at {}", lock_path.display());
            return StaleCleanup::NoLockFile;
        }

        let pid = lockfile::stale_pid(&lock_path);
        let kill = match pid {
            Some(pid) => {
                info!("Lockfile exists. Killing stale server PID {pid}");
                let hint = self.search.program_hint();
                match tokio::task::spawn_blocking(move || terminate_stale(pid, &hint)).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!("Stale server kill task failed: {e}");
                        None
                    }
                }
            }
            None => {
                warn!("Stale lock file records no usable pid");
                None
            }
        };

        if let Err(e) = lockfile::remove(&lock_path) {
            warn!("Failed to remove stale lock file: {e}");
        }

        StaleCleanup::Removed { pid, kill }
    }

    /// Spawn the server.
    ///
    /// Runs stale cleanup first, so a lock file present now cannot be
    /// mistaken for the new server's handshake.
    ///
    /// # Returns
    ///
    /// * `Ok(pid)` - Server process spawned
    /// * `Err(SupervisorError)` - Launcher or entry point missing, spawn failed,
    ///   or a server is already supervised
    pub async fn start(&mut self) -> Result<u32, SupervisorError> {
        if let Some(handle) = &self.handle
            && !handle.has_exited()
        {
            error!("start() called while PID {} is still supervised", handle.pid);
            return Err(SupervisorError::AlreadyRunning {
                pid: handle.pid,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.cleanup_stale().await;

        let launch = self.search.resolve()?;
        info!(
            "Starting Diogenes server: {} {}",
            launch.program.display(),
            launch.entry_point.display()
        );

        let mut child = build_spawn_command(&launch, &self.settings_dir)
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                message: format!("Failed to spawn {}: {e}", launch.program.display()),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(e),
            })?;

        let pid = child.id().unwrap_or_default();
        info!("Diogenes server started (PID: {pid})");

        if let Some(stdout) = child.stdout.take() {
            TokioSpawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            TokioSpawn(forward_output(stderr, "stderr"));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        let task = TokioSpawn(supervise(child, pid, kill_rx, exit_tx));

        self.handle = Some(ServerHandle {
            pid,
            exit_rx,
            kill_tx: Some(kill_tx),
            task,
        });

        Ok(pid)
    }

    /// Terminate the server and delete the lock file.
    ///
    /// Never fails: a server that already exited and a lock file that is
    /// already gone are both logged and tolerated.
    pub async fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let pid = handle.pid;

            if let Some(status) = handle.exit_status() {
                warn!("Diogenes server (PID {pid}) had already exited: {status}");
            } else if let Some(kill_tx) = handle.kill_tx.take()
                && kill_tx.send(()).is_err()
            {
                warn!("Couldn't signal Diogenes server (PID {pid}); it has already exited");
            } else {
                info!("Stopping Diogenes server (PID {pid})");
            }

            match timeout(STOP_WAIT, &mut handle.task).await {
                Ok(Ok(())) => debug!("Supervisor task for PID {pid} finished"),
                Ok(Err(e)) => warn!("Supervisor task for PID {pid} failed: {e}"),
                Err(_) => {
                    warn!("Diogenes server (PID {pid}) did not exit within {STOP_WAIT:?}");
                    handle.task.abort();
                }
            }
        }

        match lockfile::remove(&self.lock_file_path()) {
            Ok(true) => info!("Lock file removed"),
            Ok(false) => debug!("No lock file to remove"),
            Err(e) => warn!("Failed to remove lock file: {e}"),
        }
    }
}

pub(crate) fn build_spawn_command(launch: &Launch, settings_dir: &Path) -> TokioCommand {
    let mut cmd = TokioCommand::new(&launch.program);
    cmd.arg(&launch.entry_point)
        .env(CONFIG_DIR_ENV, settings_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    cmd
}

async fn forward_output<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if name == "stderr" => {
                warn!(target: SERVER_LOG_TARGET, "{name}: {line}")
            }
            Ok(Some(line)) => info!(target: SERVER_LOG_TARGET, "{name}: {line}"),
            Ok(None) => break,
            Err(e) => {
                debug!(target: SERVER_LOG_TARGET, "{name} closed: {e}");
                break;
            }
        }
    }
}

/// Own the child until it exits or a kill is requested.
async fn supervise(
    mut child: TokioChild,
    pid: u32,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<ExitStatus>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => terminate_child(&mut child, pid).await,
    };

    match status {
        Ok(status) => {
            info!("Diogenes server exited (PID {pid}): {status}");
            exit_tx.send_replace(Some(status));
        }
        Err(e) => warn!("Failed waiting on Diogenes server (PID {pid}): {e}"),
    }
}

async fn terminate_child(child: &mut TokioChild, pid: u32) -> std::io::Result<ExitStatus> {
    if process::request_termination(pid)
        && let Ok(status) = timeout(GRACEFUL_EXIT_WAIT, child.wait()).await
    {
        return status;
    }

    debug!("Force killing Diogenes server (PID {pid})");
    if let Err(e) = child.kill().await {
        warn!("Couldn't kill Diogenes server (PID {pid}): {e}");
    }
    child.wait().await
}
