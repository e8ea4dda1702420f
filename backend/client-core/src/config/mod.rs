use crate::SHELL_CONFIG_FILE_NAME;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_VERSION: u32 = 1;
const MAX_HANDSHAKE_TIMEOUT_SECS: u64 = 600;

// ============================================
// CONFIG STRUCTS
// ============================================

/// Shell tuning that lives next to the server's own preferences.
///
/// Everything is optional; a missing `shell.json` means defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Seconds to wait for the handshake file. `0` waits forever.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Interpreter to launch instead of the platform default.
    #[serde(default)]
    pub launcher: Option<PathBuf>,

    /// Server entry point to run instead of the bundled one.
    #[serde(default)]
    pub server_script: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            handshake_timeout_secs: default_handshake_timeout_secs(),
            launcher: None,
            server_script: None,
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_handshake_timeout_secs() -> u64 {
    30
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ShellConfig {
    /// Load config from {settings_dir}/shell.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ShellConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
    pub fn load(settings_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = settings_dir.join(SHELL_CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Shell config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            })?;

        let config: ShellConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        info!("Shell config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Like [`ShellConfig::load`], but a broken file is logged and replaced by defaults.
    pub fn load_or_default(settings_dir: &Path) -> Self {
        Self::load(settings_dir).unwrap_or_else(|e| {
            warn!("Shell config unusable, using defaults: {e}");
            Self::default()
        })
    }

    /// Save config to {settings_dir}/shell.json using temp file + rename.
    pub fn save(&self, settings_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(settings_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: settings_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = settings_dir.join(SHELL_CONFIG_FILE_NAME);
        let temp_path = settings_dir.join(format!("{SHELL_CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Shell config saved to {}", config_path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if self.handshake_timeout_secs > MAX_HANDSHAKE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid handshake timeout: {}s (must be 0-{MAX_HANDSHAKE_TIMEOUT_SECS})",
                    self.handshake_timeout_secs
                ),
            });
        }

        for (name, path) in [
            ("launcher", &self.launcher),
            ("server_script", &self.server_script),
        ] {
            if let Some(path) = path
                && !path.is_absolute()
            {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be an absolute path: {}", path.display()),
                });
            }
        }

        Ok(())
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0).then(|| Duration::from_secs(self.handshake_timeout_secs))
    }
}
