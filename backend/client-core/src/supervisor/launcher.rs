//! Locating the interpreter and the legacy server entry point.

use crate::config::ShellConfig;
use crate::error::supervisor::SupervisorError;

use common::ErrorLocation;

use std::ffi::OsString;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::debug;

pub const SERVER_SCRIPT: &str = "diogenes-server.pl";
const UNIX_INTERPRETER: &str = "perl";
const WINDOWS_INTERPRETER: [&str; 4] = ["strawberry", "perl", "bin", "perl.exe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// A resolved invocation: `<program> <entry_point>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: PathBuf,
    pub entry_point: PathBuf,
}

/// Where to look for the interpreter and server script.
#[derive(Debug, Clone)]
pub struct LauncherSearch {
    pub platform: Platform,
    /// Directory holding the shell executable.
    pub app_dir: PathBuf,
    /// Bundled resource directory; the server tree sits beside or above it.
    pub resource_dir: PathBuf,
    pub program_override: Option<PathBuf>,
    pub entry_point_override: Option<PathBuf>,
    /// `PATH` to search instead of the process environment.
    pub search_path: Option<OsString>,
}

impl LauncherSearch {
    pub fn new(app_dir: impl Into<PathBuf>, resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform: Platform::current(),
            app_dir: app_dir.into(),
            resource_dir: resource_dir.into(),
            program_override: None,
            entry_point_override: None,
            search_path: None,
        }
    }

    /// Apply `shell.json` overrides; unset entries keep what is already here.
    pub fn with_config(mut self, config: &ShellConfig) -> Self {
        if let Some(launcher) = &config.launcher {
            self.program_override = Some(launcher.clone());
        }
        if let Some(script) = &config.server_script {
            self.entry_point_override = Some(script.clone());
        }
        self
    }

    /// Substring used to recognise our server in a process table.
    pub fn program_hint(&self) -> String {
        self.program_override
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| UNIX_INTERPRETER.to_string())
    }

    pub fn program_candidates(&self) -> Vec<PathBuf> {
        if let Some(program) = &self.program_override {
            return vec![program.clone()];
        }

        match self.platform {
            Platform::Windows => {
                let bundled: PathBuf = WINDOWS_INTERPRETER.iter().collect();
                vec![
                    self.app_dir.join("..").join("..").join(&bundled),
                    self.app_dir.join(&bundled),
                ]
            }
            Platform::Unix => Vec::new(),
        }
    }

    pub fn entry_point_candidates(&self) -> Vec<PathBuf> {
        if let Some(script) = &self.entry_point_override {
            return vec![script.clone()];
        }

        vec![
            self.resource_dir.join("server").join(SERVER_SCRIPT),
            self.resource_dir.join("..").join("server").join(SERVER_SCRIPT),
            self.resource_dir
                .join("..")
                .join("..")
                .join("server")
                .join(SERVER_SCRIPT),
        ]
    }

    fn search_os_path(&self) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => which::which_in(UNIX_INTERPRETER, Some(paths), &self.app_dir),
            None => which::which(UNIX_INTERPRETER),
        };

        match found {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("{UNIX_INTERPRETER} not found on PATH: {e}");
                None
            }
        }
    }

    #[track_caller]
    pub fn resolve_program(&self) -> Result<PathBuf, SupervisorError> {
        let candidates = self.program_candidates();

        if let Some(found) = first_existing(&candidates) {
            return Ok(found);
        }

        if self.program_override.is_none()
            && self.platform == Platform::Unix
            && let Some(found) = self.search_os_path()
        {
            return Ok(found);
        }

        Err(SupervisorError::LauncherNotFound {
            message: format!(
                "Could not find the server launcher (searched {} and PATH)",
                display_list(&candidates)
            ),
            searched: candidates,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    pub fn resolve_entry_point(&self) -> Result<PathBuf, SupervisorError> {
        let candidates = self.entry_point_candidates();

        first_existing(&candidates).ok_or_else(|| SupervisorError::EntryPointNotFound {
            message: format!(
                "Could not find {SERVER_SCRIPT} (searched {})",
                display_list(&candidates)
            ),
            searched: candidates.clone(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    pub fn resolve(&self) -> Result<Launch, SupervisorError> {
        let program = self.resolve_program()?;
        let entry_point = self.resolve_entry_point()?;
        debug!(
            "Resolved launcher {} {}",
            program.display(),
            entry_point.display()
        );
        Ok(Launch {
            program,
            entry_point,
        })
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

fn display_list(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::from("no bundled locations");
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
