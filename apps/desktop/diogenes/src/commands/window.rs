use crate::Session;
use crate::error::DiogenesError;
use crate::window::{self, placement_from};

use client_core::session::NavTarget;

use log::info;
use serde::Deserialize;
use tauri::{AppHandle, State, command as TauriCommand};
use url::Url;

/// Destinations a page can ask for by name.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Destination {
    Home,
    Settings,
    DatabaseLocations,
    TllDownload,
}

impl From<Destination> for NavTarget {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Home => NavTarget::Home,
            Destination::Settings => NavTarget::Settings,
            Destination::DatabaseLocations => NavTarget::FirstRun,
            Destination::TllDownload => NavTarget::TllDownload,
        }
    }
}

/// Open a new window offset from `from`, showing `url` or the home page.
///
/// `reset_position` opens it at the top-left corner with the default size
/// instead, for when saved geometry has put windows off-screen. Remote URLs
/// are refused when the window navigates; it stays blank.
#[TauriCommand]
pub async fn open_window(
    app: AppHandle,
    session: State<'_, Session>,
    from: Option<String>,
    url: Option<Url>,
    reset_position: Option<bool>,
) -> Result<String, DiogenesError> {
    let target = url.map_or(NavTarget::Home, NavTarget::Link);
    let placement = placement_from(&app, from.as_deref(), reset_position.unwrap_or(false));
    info!("open_window: {target:?} {placement:?}");

    window::open(&app, &session, target, placement)
}

/// Send an existing window to one of the fixed destinations.
#[TauriCommand]
pub async fn go_to(
    session: State<'_, Session>,
    label: String,
    destination: Destination,
) -> Result<bool, DiogenesError> {
    Ok(session.windows().navigate(&label, destination.into()))
}
