use crate::FONT_CSS_FILE_NAME;
use crate::error::prefs::PrefsError;

use common::{ErrorLocation, is_not_found};

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::info;
use regex::Regex;

const FONT_PATTERN: &str = r#"font-family:\s*"([^"]*)""#;
const FORBIDDEN_CHARS: [char; 6] = ['"', ';', '{', '}', '\n', '\r'];

static FONT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_font_regex() -> &'static Regex {
    FONT_REGEX.get_or_init(|| Regex::new(FONT_PATTERN).expect("valid regex pattern"))
}

/// User font override, stored as a stylesheet the server links into every page.
pub struct FontPreference {
    path: PathBuf,
}

impl FontPreference {
    pub fn new(settings_dir: &Path) -> Self {
        Self {
            path: settings_dir.join(FONT_CSS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Currently configured font family, if any.
    pub fn read(&self) -> Result<Option<String>, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(css) => Ok(get_font_regex()
                .captures(&css)
                .map(|caps| caps[1].to_string())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(PrefsError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    pub fn write(&self, font: &str) -> Result<(), PrefsError> {
        let font = font.trim().trim_matches('"');

        if font.is_empty() || font.contains(FORBIDDEN_CHARS) {
            return Err(PrefsError::InvalidFont {
                reason: format!("'{font}' is not a usable font family"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let css = format!("body {{\n  font-family: \"{font}\";\n}}\n");
        fs::write(&self.path, css).map_err(|e| PrefsError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: self.path.clone(),
            source: e,
        })?;

        info!("Font set to {font}");
        Ok(())
    }

    /// Drop the override; the server falls back to its own stylesheet.
    pub fn revert(&self) -> Result<(), PrefsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Font override removed");
                Ok(())
            }
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(PrefsError::Write {
                location: ErrorLocation::from(Location::caller()),
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}
