use super::{ManagedWindow, QuitPolicy, SessionManager};

use crate::bridge::{Bridge, LocationPicker};
use crate::config::ShellConfig;
use crate::error::CoreError;
use crate::handshake::{HandshakeOutcome, HandshakeWatcher};
use crate::supervisor::{LauncherSearch, ServerSupervisor};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};
use tokio::sync::Mutex as AsyncMutex;
use url::Url;

/// Process-wide state of one application run.
///
/// Constructed once at startup. [`AppSession::init`] runs stale cleanup,
/// begins watching and spawns the server, in that order;
/// [`AppSession::shutdown`] undoes it.
pub struct AppSession<W: ManagedWindow + 'static> {
    settings_dir: PathBuf,
    first_run_url: Url,
    config: ShellConfig,
    supervisor: AsyncMutex<ServerSupervisor>,
    handshake: HandshakeWatcher,
    windows: Arc<Mutex<SessionManager<W>>>,
    shut_down: AtomicBool,
}

impl<W: ManagedWindow + 'static> AppSession<W> {
    pub fn new(
        settings_dir: impl Into<PathBuf>,
        search: LauncherSearch,
        first_run_url: Url,
        quit_policy: QuitPolicy,
    ) -> Self {
        let settings_dir = settings_dir.into();
        let config = ShellConfig::load_or_default(&settings_dir);
        let search = search.with_config(&config);

        Self {
            supervisor: AsyncMutex::new(ServerSupervisor::new(&settings_dir, search)),
            handshake: HandshakeWatcher::new(&settings_dir),
            windows: Arc::new(Mutex::new(SessionManager::new(
                &settings_dir,
                first_run_url.clone(),
                quit_policy,
            ))),
            settings_dir,
            first_run_url,
            config,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn first_run_url(&self) -> &Url {
        &self.first_run_url
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn handshake(&self) -> &HandshakeWatcher {
        &self.handshake
    }

    pub fn windows(&self) -> MutexGuard<'_, SessionManager<W>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Port of the ready server.
    pub fn port(&self) -> Option<u16> {
        self.handshake.state().record().map(|r| r.port)
    }

    /// Register for the handshake outcome, after the window manager.
    pub fn on_outcome<F>(&self, callback: F)
    where
        F: FnOnce(&HandshakeOutcome) + Send + 'static,
    {
        self.handshake.subscribe(callback);
    }

    /// Start the server.
    ///
    /// # Returns
    ///
    /// * `Ok(pid)` - Server spawned and being watched for its handshake
    /// * `Err(CoreError)` - Startup-fatal; the application must not continue
    pub async fn init(&self) -> Result<u32, CoreError> {
        let mut supervisor = self.supervisor.lock().await;

        supervisor.cleanup_stale().await;

        let windows = Arc::clone(&self.windows);
        self.handshake.subscribe(move |outcome| {
            let mut windows = windows.lock().unwrap_or_else(PoisonError::into_inner);
            match outcome {
                Ok(record) => {
                    let loaded = windows.on_ready(record.port);
                    debug!("Loaded {loaded} waiting window(s)");
                }
                Err(_) => windows.on_failed(),
            }
        });
        self.handshake.start(self.config.handshake_timeout())?;

        match supervisor.start().await {
            Ok(pid) => {
                if let Some(handle) = supervisor.handle() {
                    self.handshake.watch_server_exit(handle.exit_watch());
                }
                Ok(pid)
            }
            Err(e) => {
                error!("Server failed to start: {e}");
                self.handshake.cancel();
                Err(e.into())
            }
        }
    }

    /// Stop the server and remove the lock file. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already ran");
            return;
        }

        info!("Shutting down Diogenes session");
        self.handshake.cancel();
        self.supervisor.lock().await.stop().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn bridge<'a, P: LocationPicker>(&'a self, picker: &'a P) -> Bridge<'a, P> {
        Bridge::new(&self.settings_dir, self.port(), &self.first_run_url, picker)
    }
}
