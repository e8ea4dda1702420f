//! Handshake file written by the external server once it has bound a port.
//!
//! Two wire formats exist and both are accepted:
//!
//! ```text
//! {"port": 8080, "pid": 4242}
//! ```
//!
//! ```text
//! port 8080
//! pid 4242
//! ```
//!
//! A record is only trusted when both fields parse; anything else is corrupt.

use crate::LOCK_FILE_NAME;
use crate::error::lockfile::LockFileError;

use common::{ErrorLocation, is_not_found};

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const KEY_PORT: &str = "port";
const KEY_PID: &str = "pid";
const LINE_PATTERN: &str = r"^(?P<key>[A-Za-z_]+)\s+(?P<value>\S+)$";

static LINE_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_line_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| Regex::new(LINE_PATTERN).expect("valid regex pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFileRecord {
    pub port: u16,
    pub pid: u32,
}

impl LockFileRecord {
    /// Parse handshake contents in whichever format the server emitted.
    #[track_caller]
    pub fn parse(contents: &str) -> Result<Self, LockFileError> {
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Err(LockFileError::parse("lock file is empty"));
        }

        let (port, pid) = if trimmed.starts_with('{') {
            parse_json_fields(trimmed)?
        } else {
            parse_line_fields(trimmed)?
        };

        let port = port.ok_or_else(|| LockFileError::parse("no port found in lock file"))?;
        let pid = pid.ok_or_else(|| LockFileError::parse("no pid found in lock file"))?;

        let port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| LockFileError::parse(format!("invalid port '{port}'")))?;
        let pid = pid
            .parse::<u32>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| LockFileError::parse(format!("invalid pid '{pid}'")))?;

        Ok(Self { port, pid })
    }

    /// JSON form, as the current server writes it.
    pub fn to_json(&self) -> String {
        serde_json::json!({ KEY_PORT: self.port, KEY_PID: self.pid }).to_string()
    }
}

/// Numbers may arrive as JSON numbers or strings.
fn value_to_field(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

#[track_caller]
fn parse_json_fields(contents: &str) -> Result<(Option<String>, Option<String>), LockFileError> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|e| LockFileError::parse(format!("malformed JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| LockFileError::parse("JSON lock file is not an object"))?;

    Ok((
        object.get(KEY_PORT).and_then(value_to_field),
        object.get(KEY_PID).and_then(value_to_field),
    ))
}

#[track_caller]
fn parse_line_fields(contents: &str) -> Result<(Option<String>, Option<String>), LockFileError> {
    let re = get_line_regex();
    let mut port = None;
    let mut pid = None;

    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let caps = re
            .captures(line)
            .ok_or_else(|| LockFileError::parse(format!("unrecognized line '{line}'")))?;

        let value = caps["value"].to_string();
        match &caps["key"] {
            KEY_PORT => port = Some(value),
            KEY_PID => pid = Some(value),
            other => {
                return Err(LockFileError::parse(format!("unrecognized key '{other}'")));
            }
        }
    }

    Ok((port, pid))
}

pub fn lock_file_path(settings_dir: &Path) -> PathBuf {
    settings_dir.join(LOCK_FILE_NAME)
}

/// Read and parse the handshake file.
///
/// # Returns
///
/// * `Ok(None)` - The file does not exist (yet)
/// * `Ok(Some(record))` - Both fields parsed
/// * `Err(LockFileError)` - Unreadable or corrupt
#[track_caller]
pub fn read(path: &Path) -> Result<Option<LockFileRecord>, LockFileError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if is_not_found(&e) => return Ok(None),
        Err(e) => {
            return Err(LockFileError::Read {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            });
        }
    };

    trace!("Lock file contents: {contents:?}");
    LockFileRecord::parse(&contents).map(Some)
}

/// Best-effort pid extraction from a lock file that may be half-written or corrupt.
///
/// Stale cleanup only needs something to signal; it never trusts the port.
pub fn stale_pid(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;

    if let Ok(record) = LockFileRecord::parse(&contents) {
        return Some(record.pid);
    }

    let trimmed = contents.trim();
    let pid = if trimmed.starts_with('{') {
        parse_json_fields(trimmed).ok().and_then(|(_, pid)| pid)
    } else {
        trimmed
            .lines()
            .filter_map(|l| get_line_regex().captures(l.trim()))
            .find(|caps| &caps["key"] == KEY_PID)
            .map(|caps| caps["value"].to_string())
    };

    pid.and_then(|p| p.parse::<u32>().ok()).filter(|p| *p != 0)
}

/// Delete the handshake file.
///
/// # Returns
///
/// * `Ok(true)` - The file existed and was deleted
/// * `Ok(false)` - There was nothing to delete
pub fn remove(path: &Path) -> Result<bool, LockFileError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed lock file {}", path.display());
            Ok(true)
        }
        Err(e) if is_not_found(&e) => {
            debug!("Lock file {} already absent", path.display());
            Ok(false)
        }
        Err(e) => Err(LockFileError::Remove {
            path: path.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        }),
    }
}
