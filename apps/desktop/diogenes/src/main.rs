// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use diogenes::Session;
use diogenes::commands;
use diogenes::error::DiogenesError;
use diogenes::logger::initialize as LoggerInitialize;
use diogenes::window::{self, first_run_url};

use client_core::session::{AppSession, NavTarget, QuitPolicy};
use client_core::supervisor::LauncherSearch;
use client_core::window_state::Placement;

use std::env::current_exe;
use std::fs::create_dir_all;
use std::sync::Arc;

use log::{error, info, warn};
use tauri::{App, AppHandle, Manager, RunEvent};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

const EXIT_STARTUP_FAILED: i32 = 1;

fn main() {
    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            info!("Second instance launched; focusing the first window");
            focus_or_open(app);
        }))
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            commands::bridge::bridge,
            commands::window::open_window,
            commands::window::go_to,
        ])
        .setup(|app| Ok(setup(app)?))
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|handle, event| match event {
        RunEvent::ExitRequested { api, code, .. } => {
            let stay = handle
                .try_state::<Session>()
                .is_some_and(|s| s.windows().quit_policy() == QuitPolicy::StayResident);
            if code.is_none() && stay {
                api.prevent_exit();
            }
        }
        RunEvent::Exit => {
            if let Some(session) = handle.try_state::<Session>() {
                let session = Arc::clone(&session);
                tauri::async_runtime::block_on(async move { session.shutdown().await });
            }
            info!("Diogenes exited");
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen { .. } => reopen(handle),
        _ => {}
    });
}

fn setup(app: &mut App) -> Result<(), DiogenesError> {
    let log_dir = app
        .path()
        .app_log_dir()
        .map_err(|e| DiogenesError::diogenes(format!("Failed to get log directory: {e}")))?;
    create_dir_all(&log_dir)
        .map_err(|e| DiogenesError::diogenes(format!("Failed to create log directory: {e}")))?;

    // Logger first so everything after it is recorded
    LoggerInitialize(&log_dir)?;
    info!("Diogenes starting; logs in {}", log_dir.display());

    let settings_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| DiogenesError::diogenes(format!("Failed to get settings directory: {e}")))?;
    create_dir_all(&settings_dir)
        .map_err(|e| DiogenesError::diogenes(format!("Failed to create settings directory: {e}")))?;
    info!("Settings directory: {}", settings_dir.display());

    let resource_dir = app
        .path()
        .resource_dir()
        .map_err(|e| DiogenesError::diogenes(format!("Failed to get resource directory: {e}")))?;
    let app_dir = current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        .unwrap_or_else(|| resource_dir.clone());

    let session: Session = Arc::new(AppSession::new(
        settings_dir,
        LauncherSearch::new(app_dir, resource_dir),
        first_run_url()?,
        QuitPolicy::current(),
    ));
    app.manage(Arc::clone(&session));

    window::open(app.handle(), &session, NavTarget::Landing, Placement::Restore)?;

    let started = tauri::async_runtime::block_on({
        let session = Arc::clone(&session);
        async move { session.init().await }
    });

    match started {
        Ok(pid) => {
            info!("Server started with PID {pid}");
            let handle = app.handle().clone();
            session.on_outcome(move |outcome| {
                if let Err(failure) = outcome {
                    error!("Server handshake failed: {failure}");
                    fatal(&handle, &format!("Diogenes could not start its server.\n\n{failure}"));
                }
            });
        }
        Err(e) => {
            error!("Startup failed: {e}");
            fatal(app.handle(), &format!("Diogenes could not start its server.\n\n{e}"));
        }
    }

    Ok(())
}

/// Show a modal error, then quit with a failure code once it is dismissed.
fn fatal(app: &AppHandle, message: &str) {
    let handle = app.clone();
    app.dialog()
        .message(message)
        .title("Diogenes")
        .kind(MessageDialogKind::Error)
        .show(move |_| handle.exit(EXIT_STARTUP_FAILED));
}

fn focus_or_open(app: &AppHandle) {
    let Some(session) = app.try_state::<Session>() else {
        return;
    };
    if session.windows().focus_existing() {
        return;
    }

    if let Err(e) = window::open(app, &session, NavTarget::Landing, Placement::Restore) {
        warn!("Couldn't open a window for the second instance: {e}");
    }
}

#[cfg(target_os = "macos")]
fn reopen(app: &AppHandle) {
    let Some(session) = app.try_state::<Session>() else {
        return;
    };
    if !session.windows().should_reopen() {
        return;
    }

    if let Err(e) = window::open(app, &session, NavTarget::Home, Placement::Restore) {
        warn!("Couldn't reopen a window: {e}");
    }
}
