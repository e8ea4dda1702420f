//! Tauri windows as seen by the session manager.

use crate::Session;
use crate::error::DiogenesError;

use client_core::error::session::SessionError;
use client_core::session::{CloseOutcome, ManagedWindow, NavTarget, is_allowed_navigation};
use client_core::window_state::{self, Bounds, Geometry, Placement, WindowState};

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, info, warn};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent};
use url::Url;

pub const MAIN_WINDOW_LABEL: &str = "main";
const WINDOW_TITLE: &str = "Diogenes";
/// Bundled page shown until the server is ready.
const STARTING_PAGE: &str = "index.html";
const FIRST_RUN_PAGE: &str = "firstrun.html";

static NEXT_WINDOW: AtomicU32 = AtomicU32::new(1);

/// URL Tauri serves `ui/firstrun.html` from on this platform.
pub fn first_run_url() -> Result<Url, DiogenesError> {
    let base = if cfg!(windows) {
        "http://tauri.localhost/"
    } else {
        "tauri://localhost/"
    };

    Url::parse(base)
        .and_then(|base| base.join(FIRST_RUN_PAGE))
        .map_err(|e| DiogenesError::diogenes(format!("Invalid first-run URL: {e}")))
}

fn next_label() -> String {
    match NEXT_WINDOW.fetch_add(1, Ordering::SeqCst) {
        1 => MAIN_WINDOW_LABEL.to_string(),
        n => format!("window-{n}"),
    }
}

pub struct DiogenesWindow(WebviewWindow);

impl DiogenesWindow {
    fn error(&self, e: tauri::Error) -> SessionError {
        SessionError::window(self.0.label(), e.to_string())
    }
}

impl ManagedWindow for DiogenesWindow {
    fn label(&self) -> String {
        self.0.label().to_string()
    }

    fn navigate(&self, url: &Url) -> Result<(), SessionError> {
        self.0.navigate(url.clone()).map_err(|e| self.error(e))
    }

    fn is_minimized(&self) -> Result<bool, SessionError> {
        self.0.is_minimized().map_err(|e| self.error(e))
    }

    fn unminimize(&self) -> Result<(), SessionError> {
        self.0.unminimize().map_err(|e| self.error(e))
    }

    fn set_focus(&self) -> Result<(), SessionError> {
        self.0.set_focus().map_err(|e| self.error(e))
    }
}

/// Reset wins over everything; otherwise offset from an opener if there is one.
pub fn placement(reset: bool, opener_position: Option<(i32, i32)>) -> Placement {
    match (reset, opener_position) {
        (true, _) => Placement::Reset,
        (false, Some(from)) => Placement::Offset { from },
        (false, None) => Placement::Restore,
    }
}

/// Where to put a window opened from `from`, or the first window if `None`.
pub fn placement_from(app: &AppHandle, from: Option<&str>, reset: bool) -> Placement {
    let position = from
        .filter(|_| !reset)
        .and_then(|label| app.get_webview_window(label))
        .and_then(|window| {
            let scale = window.scale_factor().ok()?;
            let position = window.outer_position().ok()?.to_logical::<i32>(scale);
            Some((position.x, position.y))
        });

    placement(reset, position)
}

/// Create a window, track it, and send it to `target` once the server allows.
pub fn open(
    app: &AppHandle,
    session: &Session,
    target: NavTarget,
    placement: Placement,
) -> Result<String, DiogenesError> {
    let label = next_label();
    let saved = WindowState::load(session.settings_dir());
    let geometry = window_state::geometry(saved.as_ref(), placement);

    let window = build(app, &label, geometry)?;
    watch_events(app, session, &window);

    session.windows().open(DiogenesWindow(window), target);
    info!("Opened window '{label}'");
    Ok(label)
}

fn build(app: &AppHandle, label: &str, geometry: Geometry) -> Result<WebviewWindow, DiogenesError> {
    let mut builder = WebviewWindowBuilder::new(app, label, WebviewUrl::App(STARTING_PAGE.into()))
        .title(WINDOW_TITLE)
        .inner_size(f64::from(geometry.width), f64::from(geometry.height))
        .maximized(geometry.maximized)
        .on_navigation(|url| {
            let allowed = is_allowed_navigation(url);
            if !allowed {
                warn!("Blocked navigation to {url}");
            }
            allowed
        });

    if let Some((x, y)) = geometry.position {
        builder = builder.position(f64::from(x), f64::from(y));
    }

    builder
        .build()
        .map_err(|e| DiogenesError::window(format!("Failed to create window '{label}': {e}")))
}

fn watch_events(app: &AppHandle, session: &Session, window: &WebviewWindow) {
    let session = Arc::clone(session);
    let handle = app.clone();
    let label = window.label().to_string();

    window.on_window_event(move |event| match event {
        WindowEvent::Resized(_) | WindowEvent::Moved(_) | WindowEvent::CloseRequested { .. } => {
            if let Some(window) = handle.get_webview_window(&label) {
                save_state(&window, &session);
            }
        }
        WindowEvent::Destroyed => {
            // Guard released before exit() re-enters the run-event handler
            let outcome = session.windows().close(&label);
            match outcome {
                CloseOutcome::LastClosed { quit: false } => {
                    debug!("Last window closed; staying resident");
                }
                CloseOutcome::LastClosed { quit: true } => {
                    info!("Last window closed; quitting");
                    handle.exit(0);
                }
                CloseOutcome::StillOpen { .. } | CloseOutcome::Unknown => {}
            }
        }
        _ => {}
    });
}

fn save_state(window: &WebviewWindow, session: &Session) {
    let state = match current_state(window) {
        Ok(state) => state,
        Err(e) => {
            warn!("Couldn't read geometry of '{}': {e}", window.label());
            return;
        }
    };

    if let Err(e) = state.save(session.settings_dir()) {
        warn!("Couldn't save window state: {e}");
    }
}

fn current_state(window: &WebviewWindow) -> tauri::Result<WindowState> {
    let scale = window.scale_factor()?;
    let position = window.outer_position()?.to_logical::<i32>(scale);
    let size = window.inner_size()?.to_logical::<u32>(scale);

    Ok(WindowState::from_window(
        window.is_maximized()?,
        Bounds {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        },
    ))
}
