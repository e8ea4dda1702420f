//! Logging for the Diogenes shell: coloured stdout plus `diogenes.log`.
//!
//! Server output arrives under [`SERVER_LOG_TARGET`] and is written without
//! the shell's file/line suffix, since it did not originate in this process.

use crate::error::DiogenesError;

use client_core::supervisor::SERVER_LOG_TARGET;

use std::fmt::Arguments;
use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "diogenes.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Crates whose debug output drowns the shell's own.
const QUIET_TARGETS: [&str; 3] = ["tao", "wry", "notify"];

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize the logger once; later calls warn and return Ok.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or another logger is
/// already installed.
pub fn initialize(log_dir: &Path) -> Result<(), DiogenesError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{LOG_LEVEL:?}");
        }
    });

    result
}

/// One log line. `level` is pre-rendered so stdout can colour it.
pub fn format_line(level: impl std::fmt::Display, message: &Arguments<'_>, record: &Record<'_>) -> String {
    let date = format_rfc3339(SystemTime::now());

    if record.target() == SERVER_LOG_TARGET {
        format!("[{date} - {level}] server: {message}")
    } else {
        format!(
            "[{date} - {level}] {message} [{file}:{line}]",
            file = record.file().unwrap_or("unknown"),
            line = record.line().unwrap_or(0),
        )
    }
}

fn finish(out: FormatCallback<'_>, line: String) {
    out.finish(format_args!("{line}"))
}

#[track_caller]
fn initialize_internal(log_dir: &Path) -> Result<(), DiogenesError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let base_dispatch = QUIET_TARGETS
        .iter()
        .fold(Dispatch::new().level(LOG_LEVEL), |dispatch, target| {
            dispatch.level_for(*target, LevelFilter::Warn)
        });

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            let line = format_line(colors.color(record.level()), message, record);
            finish(out, line)
        })
        .chain(stdout());

    let log_file = fern::log_file(&log_file_path)
        .map_err(|e| DiogenesError::diogenes(format!("Failed to create log file: {e}")))?;

    let file_dispatch = Dispatch::new()
        .format(|out, message, record| {
            let line = format_line(record.level(), message, record);
            finish(out, line)
        })
        .chain(log_file);

    base_dispatch
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| DiogenesError::diogenes(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}
