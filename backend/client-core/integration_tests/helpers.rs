//! Test helpers shared by the integration tests:
//! - a recording [`MockWindow`] standing in for a toolkit window
//! - lock file and stand-in server script writers

use client_core::LOCK_FILE_NAME;
use client_core::error::session::SessionError;
use client_core::session::ManagedWindow;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

/// What a [`MockWindow`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCall {
    Navigate(String),
    Unminimize,
    Focus,
}

/// Calls across every window of a test, tagged with the window label.
pub type CallLog = Arc<Mutex<Vec<(String, WindowCall)>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub struct MockWindow {
    label: String,
    minimized: AtomicBool,
    log: CallLog,
}

impl MockWindow {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            minimized: AtomicBool::new(false),
            log: Arc::clone(log),
        }
    }

    pub fn minimized(self) -> Self {
        self.minimized.store(true, Ordering::SeqCst);
        self
    }

    fn record(&self, call: WindowCall) {
        self.log.lock().unwrap().push((self.label.clone(), call));
    }
}

impl ManagedWindow for MockWindow {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn navigate(&self, url: &Url) -> Result<(), SessionError> {
        self.record(WindowCall::Navigate(url.to_string()));
        Ok(())
    }

    fn is_minimized(&self) -> Result<bool, SessionError> {
        Ok(self.minimized.load(Ordering::SeqCst))
    }

    fn unminimize(&self) -> Result<(), SessionError> {
        self.minimized.store(false, Ordering::SeqCst);
        self.record(WindowCall::Unminimize);
        Ok(())
    }

    fn set_focus(&self) -> Result<(), SessionError> {
        self.record(WindowCall::Focus);
        Ok(())
    }
}

/// Every URL navigated to, in order, as `(label, url)`.
pub fn navigations(log: &CallLog) -> Vec<(String, String)> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|(label, call)| match call {
            WindowCall::Navigate(url) => Some((label.clone(), url.clone())),
            _ => None,
        })
        .collect()
}

pub fn first_run_url() -> Url {
    Url::parse("tauri://localhost/firstrun.html").unwrap()
}

pub fn write_lock_file(settings_dir: &Path, contents: &str) -> PathBuf {
    let path = settings_dir.join(LOCK_FILE_NAME);
    fs::write(&path, contents).unwrap();
    path
}

/// A POSIX shell script that behaves like the server: announces itself in the
/// lock file, then stays alive until signalled.
#[cfg(unix)]
pub fn write_server_script(dir: &Path, port: u16) -> PathBuf {
    let script = dir.join("fake-server.sh");
    let body = format!(
        "printf '{{\"port\":{port},\"pid\":%s}}' \"$$\" > \"$Diogenes_Config_Dir/{LOCK_FILE_NAME}\"\n\
         echo 'fake server listening'\n\
         exec sleep 30\n"
    );
    fs::write(&script, body).unwrap();
    script
}

/// A script that exits at once without writing a lock file.
#[cfg(unix)]
pub fn write_crashing_script(dir: &Path) -> PathBuf {
    let script = dir.join("crashing-server.sh");
    fs::write(&script, "echo 'cannot open database' >&2\nexit 3\n").unwrap();
    script
}
