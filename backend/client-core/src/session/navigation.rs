use crate::prefs;
use crate::{SETTINGS_PAGE, TLL_DOWNLOAD_PAGE, server_url};

use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

use log::{debug, warn};
use url::{Host, Url};

/// Host Tauri serves bundled pages from on Windows.
const APP_ASSET_HOST: &str = "tauri.localhost";
/// Scheme Tauri serves bundled pages from elsewhere.
const APP_ASSET_SCHEME: &str = "tauri";

/// Where a window should go once the server is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    /// First-run page if no database is configured, otherwise [`NavTarget::Home`].
    Landing,
    Home,
    Settings,
    /// Database locations page; served from the app bundle.
    FirstRun,
    TllDownload,
    /// A link the page asked to open in a new window.
    Link(Url),
}

impl NavTarget {
    /// Resolve against the ready server's port.
    pub fn resolve(&self, port: u16, settings_dir: &Path, first_run: &Url) -> Option<Url> {
        match self {
            NavTarget::Landing => landing(settings_dir, port, first_run),
            NavTarget::Home => home_url(port),
            NavTarget::Settings => page_url(port, SETTINGS_PAGE),
            NavTarget::FirstRun => Some(first_run.clone()),
            NavTarget::TllDownload => page_url(port, TLL_DOWNLOAD_PAGE),
            NavTarget::Link(url) => {
                if is_allowed_navigation(url) {
                    Some(url.clone())
                } else {
                    warn!("Refusing to open {url} in a new window");
                    None
                }
            }
        }
    }
}

fn home_url(port: u16) -> Option<Url> {
    Url::parse(&server_url(port)).ok()
}

fn page_url(port: u16, page: &str) -> Option<Url> {
    home_url(port).and_then(|base| base.join(page.trim_start_matches('/')).ok())
}

/// Pick the first page: first-run setup until a database is configured, then
/// the server's home page.
pub fn landing(settings_dir: &Path, port: u16, first_run: &Url) -> Option<Url> {
    if prefs::is_database_configured(settings_dir) {
        home_url(port)
    } else {
        debug!("No database configured; showing first-run page");
        Some(first_run.clone())
    }
}

/// Whether an in-page navigation may proceed.
///
/// Only loopback hosts and the app's own bundled pages are reachable.
pub fn is_allowed_navigation(url: &Url) -> bool {
    if url.scheme() == APP_ASSET_SCHEME {
        return true;
    }

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            domain.eq_ignore_ascii_case("localhost") || domain.eq_ignore_ascii_case(APP_ASSET_HOST)
        }
        Some(Host::Ipv4(ip)) => ip == Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(ip)) => ip == Ipv6Addr::LOCALHOST,
        None => false,
    }
}
