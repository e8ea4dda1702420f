use crate::Session;
use crate::error::DiogenesError;

use client_core::bridge::{BridgeRequest, BridgeResponse, LocationPicker};
use client_core::prefs::DatabaseKind;

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error};
use tauri::{AppHandle, State, command as TauriCommand};
use tauri_plugin_dialog::DialogExt;

/// Native folder/file chooser backed by the dialog plugin.
pub struct DialogPicker {
    app: AppHandle,
}

impl DialogPicker {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl LocationPicker for DialogPicker {
    fn pick(&self, db: DatabaseKind) -> Option<PathBuf> {
        let dialog = self
            .app
            .dialog()
            .file()
            .set_title(format!("Set {db} location"));

        let picked = if db.picks_file() {
            dialog.add_filter("PDF", &["pdf"]).blocking_pick_file()
        } else {
            dialog.blocking_pick_folder()
        };

        picked.and_then(|path| path.into_path().ok())
    }
}

/// Single entry point for every page request.
///
/// Runs on a blocking thread since `pickDatabase` waits for the user.
///
/// # Returns
///
/// * `Ok(BridgeResponse)` - Typed answer for the request
/// * `Err(DiogenesError)` - Server not ready, or a preference file could not be written
#[TauriCommand]
pub async fn bridge(
    app: AppHandle,
    session: State<'_, Session>,
    request: BridgeRequest,
) -> Result<BridgeResponse, DiogenesError> {
    let name = request.name();
    debug!("bridge: {name}");

    let session = Arc::clone(&session);
    let picker = DialogPicker::new(app);

    tauri::async_runtime::spawn_blocking(move || session.bridge(&picker).handle(request))
        .await
        .map_err(|e| DiogenesError::diogenes(format!("Bridge task failed: {e}")))?
        .map_err(|e| {
            error!("bridge {name} failed: {e}");
            DiogenesError::bridge(e.to_string())
        })
}
