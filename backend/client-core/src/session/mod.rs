//! Top-level windows and what they show.
//!
//! Windows are tracked in creation order. Until the handshake is ready every
//! window keeps a pending [`NavTarget`]; on `Ready` the pending targets are
//! resolved and loaded in that same order. On `Failed` nothing is ever loaded.

pub mod app;
pub mod navigation;

pub use app::AppSession;
pub use navigation::{NavTarget, is_allowed_navigation, landing};

use crate::error::session::SessionError;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use url::Url;

/// The window operations a session needs from the UI toolkit.
pub trait ManagedWindow: Send + Sync {
    fn label(&self) -> String;
    fn navigate(&self, url: &Url) -> Result<(), SessionError>;
    fn is_minimized(&self) -> Result<bool, SessionError>;
    fn unminimize(&self) -> Result<(), SessionError>;
    fn set_focus(&self) -> Result<(), SessionError>;
}

/// What happens when the last tracked window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitPolicy {
    QuitOnLastWindow,
    /// Keep running and reopen a window on activation (macOS dock click).
    StayResident,
}

impl QuitPolicy {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            QuitPolicy::StayResident
        } else {
            QuitPolicy::QuitOnLastWindow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Pending,
    Ready(u16),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The label was not tracked.
    Unknown,
    StillOpen { remaining: usize },
    LastClosed { quit: bool },
}

struct TrackedWindow<W> {
    window: W,
    pending: Option<NavTarget>,
}

pub struct SessionManager<W: ManagedWindow> {
    settings_dir: PathBuf,
    first_run_url: Url,
    quit_policy: QuitPolicy,
    status: ServerStatus,
    windows: Vec<TrackedWindow<W>>,
}

impl<W: ManagedWindow> SessionManager<W> {
    pub fn new(settings_dir: impl Into<PathBuf>, first_run_url: Url, quit_policy: QuitPolicy) -> Self {
        Self {
            settings_dir: settings_dir.into(),
            first_run_url,
            quit_policy,
            status: ServerStatus::Pending,
            windows: Vec::new(),
        }
    }

    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn port(&self) -> Option<u16> {
        match self.status {
            ServerStatus::Ready(port) => Some(port),
            _ => None,
        }
    }

    pub fn quit_policy(&self) -> QuitPolicy {
        self.quit_policy
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.windows.iter().map(|t| t.window.label()).collect()
    }

    pub fn first_window(&self) -> Option<&W> {
        self.windows.first().map(|t| &t.window)
    }

    pub fn is_pending(&self, label: &str) -> bool {
        self.find(label)
            .is_some_and(|i| self.windows[i].pending.is_some())
    }

    fn find(&self, label: &str) -> Option<usize> {
        self.windows.iter().position(|t| t.window.label() == label)
    }

    pub fn resolve(&self, target: &NavTarget) -> Option<Url> {
        match self.status {
            ServerStatus::Ready(port) => target.resolve(port, &self.settings_dir, &self.first_run_url),
            ServerStatus::Pending | ServerStatus::Failed => None,
        }
    }

    /// Track a new window and send it to `target` as soon as the server allows.
    ///
    /// Returns true if it navigated immediately.
    pub fn open(&mut self, window: W, target: NavTarget) -> bool {
        let label = window.label();
        info!("Tracking window '{label}' ({} open)", self.windows.len() + 1);

        let (pending, navigated) = match self.status {
            ServerStatus::Ready(_) => (None, self.load(&window, &target)),
            ServerStatus::Pending => {
                debug!("Window '{label}' waits for the server");
                (Some(target), false)
            }
            ServerStatus::Failed => {
                warn!("Window '{label}' opened after server failure; leaving it blank");
                (None, false)
            }
        };

        self.windows.push(TrackedWindow { window, pending });
        navigated
    }

    /// Send an already tracked window somewhere else.
    ///
    /// Before the server is ready this replaces its pending target.
    pub fn navigate(&mut self, label: &str, target: NavTarget) -> bool {
        let Some(index) = self.find(label) else {
            warn!("navigate: window '{label}' is not tracked");
            return false;
        };

        match self.status {
            ServerStatus::Ready(_) => self.load(&self.windows[index].window, &target),
            ServerStatus::Pending => {
                self.windows[index].pending = Some(target);
                false
            }
            ServerStatus::Failed => false,
        }
    }

    fn load(&self, window: &W, target: &NavTarget) -> bool {
        let Some(url) = self.resolve(target) else {
            warn!("No URL for {target:?}");
            return false;
        };

        if !is_allowed_navigation(&url) {
            warn!("Blocked navigation of '{}' to {url}", window.label());
            return false;
        }

        match window.navigate(&url) {
            Ok(()) => {
                debug!("Window '{}' -> {url}", window.label());
                true
            }
            Err(e) => {
                warn!("Couldn't navigate window '{}': {e}", window.label());
                false
            }
        }
    }

    /// The handshake reached `Ready`: load every pending window, oldest first.
    ///
    /// Only the first call has any effect.
    pub fn on_ready(&mut self, port: u16) -> usize {
        if self.status != ServerStatus::Pending {
            debug!("on_ready({port}) ignored; status already {:?}", self.status);
            return 0;
        }
        self.status = ServerStatus::Ready(port);

        let pending: Vec<(usize, NavTarget)> = self
            .windows
            .iter_mut()
            .enumerate()
            .filter_map(|(i, t)| t.pending.take().map(|target| (i, target)))
            .collect();

        pending
            .into_iter()
            .filter(|(i, target)| self.load(&self.windows[*i].window, target))
            .count()
    }

    /// The handshake failed: drop every pending target.
    pub fn on_failed(&mut self) {
        if self.status != ServerStatus::Pending {
            return;
        }
        self.status = ServerStatus::Failed;
        for tracked in &mut self.windows {
            tracked.pending = None;
        }
    }

    /// Forget a closed window and apply the quit policy.
    pub fn close(&mut self, label: &str) -> CloseOutcome {
        let Some(index) = self.find(label) else {
            return CloseOutcome::Unknown;
        };
        self.windows.remove(index);
        info!("Window '{label}' closed ({} open)", self.windows.len());

        if self.windows.is_empty() {
            CloseOutcome::LastClosed {
                quit: self.quit_policy == QuitPolicy::QuitOnLastWindow,
            }
        } else {
            CloseOutcome::StillOpen {
                remaining: self.windows.len(),
            }
        }
    }

    /// Whether an activation (dock click) should create a window.
    pub fn should_reopen(&self) -> bool {
        self.windows.is_empty()
    }

    /// A second launch was attempted: restore and focus the first window.
    ///
    /// Returns false when there is nothing to focus.
    pub fn focus_existing(&self) -> bool {
        let Some(window) = self.first_window() else {
            debug!("Second instance with no open windows");
            return false;
        };

        match window.is_minimized() {
            Ok(true) => {
                if let Err(e) = window.unminimize() {
                    warn!("Couldn't restore window '{}': {e}", window.label());
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Couldn't query window '{}': {e}", window.label()),
        }

        if let Err(e) = window.set_focus() {
            warn!("Couldn't focus window '{}': {e}", window.label());
            return false;
        }
        true
    }
}
