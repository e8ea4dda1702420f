//! Line-oriented preference file shared with the server.
//!
//! Each configured corpus occupies one `<db>_dir "<path>"` line. Every other
//! line, comments included, belongs to the server and is preserved verbatim.

pub mod database;
pub mod font;

pub use database::{DatabaseKind, location_looks_valid, marker_exists};
pub use font::FontPreference;

use crate::PREFS_FILE_NAME;
use crate::error::prefs::PrefsError;

use common::{ErrorLocation, is_not_found};

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;

/// First line of a preference file created by the shell.
pub const PREFS_HEADER: &str = "# Created by Diogenes";

/// Characters that would end the quoted value or start another line.
const FORBIDDEN_LOCATION_CHARS: [char; 3] = ['"', '\n', '\r'];

const CONFIGURED_PATTERN: &str = r"^[^#\s]\S*_dir\s+\S";

static CONFIGURED_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_configured_regex() -> &'static Regex {
    CONFIGURED_REGEX.get_or_init(|| Regex::new(CONFIGURED_PATTERN).expect("valid regex pattern"))
}

fn key_regex(kind: DatabaseKind) -> Regex {
    Regex::new(&format!(r"^{}_dir(\s|$)", regex::escape(&kind.key()))).expect("valid regex pattern")
}

fn value_regex(kind: DatabaseKind) -> Regex {
    Regex::new(&format!(r#"^{}_dir\s+"?(.*?)"?\s*$"#, regex::escape(&kind.key())))
        .expect("valid regex pattern")
}

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    lines: Vec<String>,
    line_ending: &'static str,
    trailing_newline: bool,
    exists: bool,
}

impl PreferenceStore {
    /// Load `{settings_dir}/diogenes.prefs`.
    ///
    /// A missing file is the first-run case and yields an empty store.
    #[track_caller]
    pub fn load(settings_dir: &Path) -> Result<Self, PrefsError> {
        let path = settings_dir.join(PREFS_FILE_NAME);

        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Preferences loaded from {}", path.display());
                Ok(Self::from_contents(path, &contents))
            }
            Err(e) if is_not_found(&e) => {
                debug!("No preferences at {} yet", path.display());
                Ok(Self {
                    path,
                    lines: Vec::new(),
                    line_ending: "\n",
                    trailing_newline: false,
                    exists: false,
                })
            }
            Err(e) => Err(PrefsError::Read {
                location: ErrorLocation::from(Location::caller()),
                path,
                source: e,
            }),
        }
    }

    fn from_contents(path: PathBuf, contents: &str) -> Self {
        Self {
            path,
            lines: contents.lines().map(str::to_string).collect(),
            line_ending: if contents.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: contents.ends_with('\n'),
            exists: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// File contents as they would be written, `None` before first write.
    pub fn contents(&self) -> Option<String> {
        self.exists.then(|| self.render())
    }

    fn render(&self) -> String {
        let mut out = self.lines.join(self.line_ending);
        if self.trailing_newline {
            out.push_str(self.line_ending);
        }
        out
    }

    /// True iff the file exists and holds at least one active `<key>_dir <value>` line.
    pub fn is_database_configured(&self) -> bool {
        let re = get_configured_regex();
        self.exists && self.lines.iter().any(|line| re.is_match(line))
    }

    pub fn get_path(&self, kind: DatabaseKind) -> Option<String> {
        let re = value_regex(kind);
        self.lines
            .iter()
            .find_map(|line| re.captures(line).map(|caps| caps[1].to_string()))
    }

    /// Point `kind` at `location`, replacing its line in place or appending one.
    ///
    /// Later duplicates of the same key are dropped so exactly one line remains.
    /// A location that could not be written as a single quoted value is
    /// rejected and the store is left untouched.
    pub fn set_path(&mut self, kind: DatabaseKind, location: &str) -> Result<(), PrefsError> {
        if location.contains(FORBIDDEN_LOCATION_CHARS) {
            return Err(PrefsError::InvalidLocation {
                reason: format!("{kind} location {location:?} contains a quote or line break"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let new_line = format!("{}_dir \"{}\"", kind.key(), location);
        let re = key_regex(kind);

        if !self.exists {
            self.lines = vec![PREFS_HEADER.to_string()];
        }

        let mut replaced = false;
        self.lines.retain_mut(|line| {
            if !re.is_match(line) {
                return true;
            }
            if replaced {
                return false;
            }
            *line = new_line.clone();
            replaced = true;
            true
        });

        if !replaced {
            self.lines.push(new_line);
        }

        self.save()?;
        info!("{kind} location set to: {location}");
        Ok(())
    }

    fn save(&mut self) -> Result<(), PrefsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| PrefsError::Write {
                location: ErrorLocation::from(Location::caller()),
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&self.path, self.render()).map_err(|e| PrefsError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: self.path.clone(),
            source: e,
        })?;

        self.exists = true;
        Ok(())
    }
}

/// First-run predicate: does `{settings_dir}/diogenes.prefs` name any database?
///
/// Read failures count as "not configured".
pub fn is_database_configured(settings_dir: &Path) -> bool {
    PreferenceStore::load(settings_dir)
        .map(|store| store.is_database_configured())
        .unwrap_or(false)
}
