pub mod bridge;
pub mod config;
pub mod error;
pub mod handshake;
pub mod lockfile;
pub mod prefs;
pub mod session;
pub mod supervisor;
pub mod window_state;

#[cfg(test)]
mod tests;

pub const SERVER_HOSTNAME: &str = "localhost";
pub const SERVER_BASE_URL: &str = const_format::concatcp!("http://", SERVER_HOSTNAME);

/// Handshake file the server writes once it has bound a port.
pub const LOCK_FILE_NAME: &str = "diogenes-lock.json";
pub const PREFS_FILE_NAME: &str = "diogenes.prefs";
pub const WINDOW_STATE_FILE_NAME: &str = "windowstate.json";
pub const FONT_CSS_FILE_NAME: &str = "config.css";
pub const SHELL_CONFIG_FILE_NAME: &str = "shell.json";

/// Environment variable through which the server learns the settings directory.
pub const CONFIG_DIR_ENV: &str = "Diogenes_Config_Dir";

pub const SETTINGS_PAGE: &str = "/Settings.cgi";
pub const TLL_DOWNLOAD_PAGE: &str = "/tll-pdf-download.cgi";

/// `http://localhost:<port>/`
pub fn server_url(port: u16) -> String {
    format!("{SERVER_BASE_URL}:{port}/")
}
