//! Last known window geometry, persisted in `windowstate.json`.

use crate::WINDOW_STATE_FILE_NAME;
use crate::error::window_state::WindowStateError;

use common::{ErrorLocation, is_not_found};

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Offset of an additional window from the one it was opened from.
pub const NEW_WINDOW_OFFSET: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowState {
    #[serde(default)]
    pub maximized: bool,

    /// Only recorded while the window is not maximized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

/// Where a new window should appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First window of the session: restore the saved geometry.
    Restore,
    /// Opened from an existing window at `from`.
    Offset { from: (i32, i32) },
    /// Escape hatch when saved bounds put windows off-screen.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// `None` lets the platform choose.
    pub position: Option<(i32, i32)>,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
}

pub fn window_state_path(settings_dir: &Path) -> PathBuf {
    settings_dir.join(WINDOW_STATE_FILE_NAME)
}

impl WindowState {
    pub fn from_window(maximized: bool, bounds: Bounds) -> Self {
        Self {
            maximized,
            bounds: (!maximized).then_some(bounds),
        }
    }

    pub fn read(path: &Path) -> Result<Option<Self>, WindowStateError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => {
                return Err(WindowStateError::Read {
                    path: path.to_path_buf(),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| WindowStateError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Saved state, or `None` when absent or unreadable.
    pub fn load(settings_dir: &Path) -> Option<Self> {
        match Self::read(&window_state_path(settings_dir)) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring saved window state: {e}");
                None
            }
        }
    }

    pub fn save(&self, settings_dir: &Path) -> Result<(), WindowStateError> {
        let path = window_state_path(settings_dir);

        let json = serde_json::to_string(self).map_err(|e| WindowStateError::Write {
            path: path.clone(),
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::write(&path, json).map_err(|e| WindowStateError::Write {
            path: path.clone(),
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!("Window state saved: {self:?}");
        Ok(())
    }
}

/// Geometry for a window about to be created.
pub fn geometry(saved: Option<&WindowState>, placement: Placement) -> Geometry {
    let saved_bounds = saved.and_then(|s| s.bounds);
    let maximized = saved.is_some_and(|s| s.maximized);

    let (width, height) = saved_bounds
        .map(|b| (b.width, b.height))
        .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

    match placement {
        Placement::Restore => Geometry {
            position: saved_bounds.map(|b| (b.x, b.y)),
            width,
            height,
            maximized,
        },
        Placement::Offset { from: (x, y) } => Geometry {
            position: Some((x + NEW_WINDOW_OFFSET, y + NEW_WINDOW_OFFSET)),
            width,
            height,
            maximized,
        },
        Placement::Reset => Geometry {
            position: Some((0, 0)),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            maximized: false,
        },
    }
}
