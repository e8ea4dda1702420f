//! The one request/response interface between pages and the shell.
//!
//! Pages send a [`BridgeRequest`] and get back a [`BridgeResponse`]. Both are
//! adjacently tagged so the JSON reads `{"op": "writeFont", "args": {...}}`.

pub use crate::error::bridge::BridgeError;

use crate::prefs::{self, DatabaseKind, FontPreference, PreferenceStore};
use crate::session::navigation;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "camelCase")]
pub enum BridgeRequest {
    GetPort,
    GetSettingsDir,
    /// Raw preference file plus the parsed location of each database.
    ReadPreferences,
    /// Ask the user for a location, then store it.
    PickDatabase { db: DatabaseKind },
    SetDatabasePath { db: DatabaseKind, path: String },
    MarkerExists { path: String },
    ReadFont,
    WriteFont { font: String },
    RevertFont,
    /// URL the first window should show.
    Landing,
}

impl BridgeRequest {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeRequest::GetPort => "getPort",
            BridgeRequest::GetSettingsDir => "getSettingsDir",
            BridgeRequest::ReadPreferences => "readPreferences",
            BridgeRequest::PickDatabase { .. } => "pickDatabase",
            BridgeRequest::SetDatabasePath { .. } => "setDatabasePath",
            BridgeRequest::MarkerExists { .. } => "markerExists",
            BridgeRequest::ReadFont => "readFont",
            BridgeRequest::WriteFont { .. } => "writeFont",
            BridgeRequest::RevertFont => "revertFont",
            BridgeRequest::Landing => "landing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseLocation {
    pub db: DatabaseKind,
    pub path: Option<String>,
    /// Advisory only; a location without its marker file is still stored.
    pub looks_valid: bool,
}

impl DatabaseLocation {
    fn new(db: DatabaseKind, path: Option<String>) -> Self {
        let looks_valid = path
            .as_deref()
            .is_some_and(|p| prefs::location_looks_valid(db, Path::new(p)));
        Self {
            db,
            path,
            looks_valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum BridgeResponse {
    Port(u16),
    SettingsDir(PathBuf),
    Preferences {
        contents: Option<String>,
        configured: bool,
        locations: Vec<DatabaseLocation>,
    },
    /// `None` when the user cancelled the picker.
    Location(Option<DatabaseLocation>),
    MarkerExists(bool),
    Font(Option<String>),
    Landing(Url),
    Done,
}

/// Native location chooser for [`BridgeRequest::PickDatabase`].
pub trait LocationPicker {
    /// Blocks until the user chooses or cancels.
    fn pick(&self, db: DatabaseKind) -> Option<PathBuf>;
}

/// Picker for contexts with no UI; always cancels.
pub struct NoPicker;

impl LocationPicker for NoPicker {
    fn pick(&self, _db: DatabaseKind) -> Option<PathBuf> {
        None
    }
}

pub struct Bridge<'a, P: LocationPicker> {
    settings_dir: &'a Path,
    port: Option<u16>,
    first_run_url: &'a Url,
    picker: &'a P,
}

impl<'a, P: LocationPicker> Bridge<'a, P> {
    pub fn new(settings_dir: &'a Path, port: Option<u16>, first_run_url: &'a Url, picker: &'a P) -> Self {
        Self {
            settings_dir,
            port,
            first_run_url,
            picker,
        }
    }

    #[track_caller]
    fn port(&self) -> Result<u16, BridgeError> {
        self.port.ok_or_else(BridgeError::not_ready)
    }

    pub fn handle(&self, request: BridgeRequest) -> Result<BridgeResponse, BridgeError> {
        debug!("Bridge request: {}", request.name());

        match request {
            BridgeRequest::GetPort => Ok(BridgeResponse::Port(self.port()?)),

            BridgeRequest::GetSettingsDir => {
                Ok(BridgeResponse::SettingsDir(self.settings_dir.to_path_buf()))
            }

            BridgeRequest::ReadPreferences => {
                if let Err(e) = fs::create_dir_all(self.settings_dir) {
                    warn!("Couldn't create {}: {e}", self.settings_dir.display());
                }
                let store = PreferenceStore::load(self.settings_dir)?;
                let locations = DatabaseKind::ALL
                    .iter()
                    .map(|db| DatabaseLocation::new(*db, store.get_path(*db)))
                    .collect();

                Ok(BridgeResponse::Preferences {
                    contents: store.contents(),
                    configured: store.is_database_configured(),
                    locations,
                })
            }

            BridgeRequest::PickDatabase { db } => match self.picker.pick(db) {
                Some(path) => {
                    let path = path.to_string_lossy().to_string();
                    self.store_location(db, &path).map(|l| BridgeResponse::Location(Some(l)))
                }
                None => {
                    debug!("{db} location picker cancelled");
                    Ok(BridgeResponse::Location(None))
                }
            },

            BridgeRequest::SetDatabasePath { db, path } => self
                .store_location(db, &path)
                .map(|l| BridgeResponse::Location(Some(l))),

            BridgeRequest::MarkerExists { path } => Ok(BridgeResponse::MarkerExists(
                prefs::marker_exists(Path::new(&path)),
            )),

            BridgeRequest::ReadFont => Ok(BridgeResponse::Font(
                FontPreference::new(self.settings_dir).read()?,
            )),

            BridgeRequest::WriteFont { font } => {
                FontPreference::new(self.settings_dir).write(&font)?;
                Ok(BridgeResponse::Done)
            }

            BridgeRequest::RevertFont => {
                FontPreference::new(self.settings_dir).revert()?;
                Ok(BridgeResponse::Done)
            }

            BridgeRequest::Landing => {
                let port = self.port()?;
                navigation::landing(self.settings_dir, port, self.first_run_url)
                    .map(BridgeResponse::Landing)
                    .ok_or_else(BridgeError::not_ready)
            }
        }
    }

    fn store_location(&self, db: DatabaseKind, path: &str) -> Result<DatabaseLocation, BridgeError> {
        let mut store = PreferenceStore::load(self.settings_dir)?;
        store.set_path(db, path)?;
        info!("{db} location set to: {path}");
        Ok(DatabaseLocation::new(db, Some(path.to_string())))
    }
}
