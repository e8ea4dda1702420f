//! Waits for the server to announce its port through the lock file.
//!
//! The settings directory is watched non-recursively. Only creation and
//! modification of the lock file move the state machine in [`state`]; the
//! outcome is published once to every subscriber, in registration order.

pub mod state;

pub use state::{Handshake, HandshakeFailure, HandshakeOutcome, HandshakeState};

use crate::error::handshake::HandshakeError;
use crate::lockfile;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Called once with the handshake outcome.
pub type Subscriber = Box<dyn FnOnce(&HandshakeOutcome) + Send + 'static>;

struct Shared {
    machine: Handshake,
    subscribers: Vec<Subscriber>,
    /// Set from the terminal transition until the last subscriber has run.
    publishing: bool,
}

pub struct HandshakeWatcher {
    settings_dir: PathBuf,
    shared: Arc<Mutex<Shared>>,
    state_tx: watch::Sender<HandshakeState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HandshakeWatcher {
    pub fn new(settings_dir: impl Into<PathBuf>) -> Self {
        let settings_dir = settings_dir.into();
        let machine = Handshake::new(lockfile::lock_file_path(&settings_dir));
        let (state_tx, _) = watch::channel(HandshakeState::Idle);

        Self {
            settings_dir,
            shared: Arc::new(Mutex::new(Shared {
                machine,
                subscribers: Vec::new(),
                publishing: false,
            })),
            state_tx,
            task: Mutex::new(None),
        }
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn state(&self) -> HandshakeState {
        lock(&self.shared).machine.state().clone()
    }

    /// Register a callback for the outcome.
    ///
    /// If the outcome is already known the callback runs immediately, on the
    /// calling thread. While it is still being published the callback joins
    /// the end of the queue instead.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: FnOnce(&HandshakeOutcome) + Send + 'static,
    {
        let mut shared = lock(&self.shared);
        if shared.publishing {
            shared.subscribers.push(Box::new(callback));
            return;
        }

        match shared.machine.state().outcome() {
            Some(outcome) => {
                drop(shared);
                callback(&outcome);
            }
            None => shared.subscribers.push(Box::new(callback)),
        }
    }

    /// Resolve once the handshake reaches `Ready` or `Failed` and every
    /// subscriber has been called.
    pub async fn outcome(&self) -> HandshakeOutcome {
        let mut rx = self.state_tx.subscribe();
        if let Ok(state) = rx.wait_for(HandshakeState::is_terminal).await
            && let Some(outcome) = state.outcome()
        {
            return outcome;
        }

        self.state().outcome().unwrap_or(Err(HandshakeFailure::ServerExited {
            status: String::from("handshake watcher dropped"),
        }))
    }

    /// Begin watching the settings directory.
    ///
    /// Must be called before the server is spawned. `timeout` of `None`
    /// waits forever.
    #[track_caller]
    pub fn start(&self, timeout: Option<Duration>) -> Result<(), HandshakeError> {
        if !lock(&self.shared).machine.begin() {
            return Err(HandshakeError::AlreadyStarted {
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.state_tx.send_replace(HandshakeState::Watching);

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            // Receiver gone means the handshake already finished.
            let _ = event_tx.send(event);
        })
        .and_then(|mut watcher| {
            watcher.watch(&self.settings_dir, RecursiveMode::NonRecursive)?;
            Ok(watcher)
        });

        let watcher = match watcher {
            Ok(watcher) => watcher,
            Err(e) => {
                return Err(HandshakeError::Watch {
                    path: self.settings_dir.clone(),
                    message: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                });
            }
        };

        debug!("Watching {} for the lock file", self.settings_dir.display());

        let task = TokioSpawn(run(
            watcher,
            event_rx,
            timeout,
            Arc::clone(&self.shared),
            self.state_tx.clone(),
        ));
        *lock_task(&self.task) = Some(task);

        Ok(())
    }

    /// Fail the handshake early if the server dies before announcing itself.
    pub fn watch_server_exit(&self, mut exit_rx: watch::Receiver<Option<ExitStatus>>) {
        let shared = Arc::clone(&self.shared);
        let state_tx = self.state_tx.clone();

        TokioSpawn(async move {
            let status = match exit_rx.wait_for(Option::is_some).await {
                Ok(status) => (*status).map(|s| s.to_string()),
                Err(_) => return,
            };
            let status = status.unwrap_or_else(|| String::from("unknown status"));
            apply(&shared, &state_tx, |m| m.on_server_exit(status));
        });
    }

    /// Stop watching without an outcome. Subscribers are not called.
    pub fn cancel(&self) {
        if let Some(task) = lock_task(&self.task).take() {
            debug!("Handshake watch cancelled");
            task.abort();
        }
    }
}

impl Drop for HandshakeWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(
    watcher: RecommendedWatcher,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    timeout: Option<Duration>,
    shared: Arc<Mutex<Shared>>,
    state_tx: watch::Sender<HandshakeState>,
) {
    // Held until the task ends; dropping it stops the OS watch.
    let _watcher = watcher;

    let deadline = async {
        match timeout {
            Some(after) => {
                tokio::time::sleep(after).await;
                after
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(Ok(event)) => {
                    apply(&shared, &state_tx, |m| m.on_fs_event(&event.kind, &event.paths));
                }
                Some(Err(e)) => warn!("Settings directory watch error: {e}"),
                None => {
                    warn!("Settings directory watch closed");
                    break;
                }
            },
            after = &mut deadline => {
                apply(&shared, &state_tx, |m| m.on_timeout(after));
            }
        }

        if lock(&shared).machine.state().is_terminal() {
            break;
        }
    }

    debug!("Handshake watch finished");
}

/// Run one transition and, if it produced the outcome, publish it.
fn apply<F>(shared: &Mutex<Shared>, state_tx: &watch::Sender<HandshakeState>, transition: F)
where
    F: FnOnce(&mut Handshake) -> Option<HandshakeOutcome>,
{
    let outcome = {
        let mut guard = lock(shared);
        let Some(outcome) = transition(&mut guard.machine) else {
            return;
        };
        guard.publishing = true;
        outcome
    };

    // Callbacks may subscribe again; drain until nothing new was queued.
    loop {
        let subscribers = {
            let mut guard = lock(shared);
            let subscribers = std::mem::take(&mut guard.subscribers);
            if subscribers.is_empty() {
                guard.publishing = false;
                break;
            }
            subscribers
        };

        for subscriber in subscribers {
            subscriber(&outcome);
        }
    }

    state_tx.send_replace(match &outcome {
        Ok(record) => HandshakeState::Ready(*record),
        Err(failure) => HandshakeState::Failed(failure.clone()),
    });
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_task(task: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    task.lock().unwrap_or_else(PoisonError::into_inner)
}
