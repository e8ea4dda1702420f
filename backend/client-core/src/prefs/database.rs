use crate::error::prefs::PrefsError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MARKER_FILES: [&str; 2] = ["authtab.dir", "AUTHTAB.DIR"];

/// A corpus location the server can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseKind {
    Phi,
    Tlg,
    Ddp,
    TllPdf,
    OldPdf,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 5] = [
        DatabaseKind::Phi,
        DatabaseKind::Tlg,
        DatabaseKind::Ddp,
        DatabaseKind::TllPdf,
        DatabaseKind::OldPdf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatabaseKind::Phi => "PHI",
            DatabaseKind::Tlg => "TLG",
            DatabaseKind::Ddp => "DDP",
            DatabaseKind::TllPdf => "TLL_PDF",
            DatabaseKind::OldPdf => "OLD_PDF",
        }
    }

    /// Key prefix in `diogenes.prefs`, e.g. `phi` for `phi_dir "..."`.
    pub fn key(&self) -> String {
        self.name().to_lowercase()
    }

    /// Text databases ship an `authtab.dir`; PDF collections do not.
    pub fn expects_marker(&self) -> bool {
        matches!(self, DatabaseKind::Phi | DatabaseKind::Tlg | DatabaseKind::Ddp)
    }

    /// The OLD_PDF location is a single file; everything else is a directory.
    pub fn picks_file(&self) -> bool {
        matches!(self, DatabaseKind::OldPdf)
    }
}

impl Display for DatabaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.name())
    }
}

impl FromStr for DatabaseKind {
    type Err = PrefsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PrefsError::UnknownDatabase {
                name: s.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// True when `dir` contains the marker file of a text database.
///
/// Advisory only: the UI flags a missing marker but still saves the path.
pub fn marker_exists(dir: &Path) -> bool {
    MARKER_FILES.iter().any(|marker| dir.join(marker).is_file())
}

/// Whether the selected location passes the advisory check for `kind`.
pub fn location_looks_valid(kind: DatabaseKind, location: &Path) -> bool {
    !kind.expects_marker() || marker_exists(location)
}
