use crate::PREFS_FILE_NAME;
use crate::session::navigation::{NavTarget, is_allowed_navigation, landing};

use std::fs;

use tempfile::TempDir;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn first_run() -> Url {
    url("tauri://localhost/firstrun.html")
}

/// **VALUE**: Loopback and bundled pages pass the navigation guard.
///
/// **WHY THIS MATTERS**: The first-run page is bundled with the app and its
/// Done button navigates to the server. Blocking either strands the user.
#[test]
fn given_loopback_or_app_asset_url_when_guard_checked_then_allowed() {
    // GIVEN: URLs the app itself produces
    let allowed = [
        "http://localhost:8080/",
        "http://LOCALHOST:8080/Settings.cgi",
        "http://127.0.0.1:8080/Perseus.cgi?q=logos",
        "http://[::1]:8080/",
        "tauri://localhost/firstrun.html",
        "http://tauri.localhost/firstrun.html",
    ];

    // WHEN/THEN: Every one is allowed
    for candidate in allowed {
        assert!(is_allowed_navigation(&url(candidate)), "{candidate}");
    }
}

/// **VALUE**: Remote origins are refused.
///
/// **BUG THIS CATCHES**: Would catch a prefix match on "localhost" letting
/// `localhost.evil.example` through, or `file:` URLs escaping the guard.
#[test]
fn given_remote_url_when_guard_checked_then_refused() {
    // GIVEN: URLs pointing away from the machine
    let refused = [
        "https://example.org/",
        "http://localhost.evil.example:8080/",
        "http://127.0.0.2:8080/",
        "http://10.0.0.1/",
        "file:///etc/passwd",
        "ftp://localhost/",
    ];

    // WHEN/THEN: None are allowed
    for candidate in refused {
        assert!(!is_allowed_navigation(&url(candidate)), "{candidate}");
    }
}

/// **VALUE**: Server pages resolve against the handshake port.
#[test]
fn given_port_when_targets_resolved_then_urls_use_it() {
    // GIVEN: A settings dir and a ready port
    let dir = TempDir::new().unwrap();
    let port = 8080;

    // WHEN: Resolving the fixed destinations
    let home = NavTarget::Home.resolve(port, dir.path(), &first_run());
    let settings = NavTarget::Settings.resolve(port, dir.path(), &first_run());
    let tll = NavTarget::TllDownload.resolve(port, dir.path(), &first_run());
    let setup = NavTarget::FirstRun.resolve(port, dir.path(), &first_run());

    // THEN: Each points at the expected page
    assert_eq!(home, Some(url("http://localhost:8080/")));
    assert_eq!(settings, Some(url("http://localhost:8080/Settings.cgi")));
    assert_eq!(tll, Some(url("http://localhost:8080/tll-pdf-download.cgi")));
    assert_eq!(setup, Some(first_run()));
}

/// **VALUE**: A link the page wants opened in a new window is still guarded.
#[test]
fn given_remote_link_when_resolved_then_none() {
    // GIVEN: A remote link
    let dir = TempDir::new().unwrap();
    let target = NavTarget::Link(url("https://example.org/"));

    // WHEN/THEN: It resolves to nothing
    assert_eq!(target.resolve(8080, dir.path(), &first_run()), None);
}

/// **VALUE**: Without preferences the landing page is the first-run page.
#[test]
fn given_no_prefs_when_landing_then_first_run_page() {
    // GIVEN: An empty settings directory
    let dir = TempDir::new().unwrap();

    // WHEN: Choosing the landing page
    let page = landing(dir.path(), 8080, &first_run());

    // THEN: First-run setup is shown
    assert_eq!(page, Some(first_run()));
}

/// **VALUE**: With a configured database the landing page is the server home.
#[test]
fn given_configured_prefs_when_landing_then_server_home() {
    // GIVEN: A preference file naming a database
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(PREFS_FILE_NAME),
        "# Created by Diogenes\ntlg_dir \"/data/tlg\"\n",
    )
    .unwrap();

    // WHEN: Choosing the landing page
    let page = landing(dir.path(), 8080, &first_run());

    // THEN: The server's home page
    assert_eq!(page, Some(url("http://localhost:8080/")));
}
