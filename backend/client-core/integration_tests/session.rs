use client_core::PREFS_FILE_NAME;
use client_core::session::{CloseOutcome, NavTarget, QuitPolicy, ServerStatus, SessionManager};

use crate::helpers::{MockWindow, WindowCall, call_log, first_run_url, navigations};

use std::fs;

use tempfile::TempDir;
use url::Url;

fn manager(dir: &TempDir, policy: QuitPolicy) -> SessionManager<MockWindow> {
    SessionManager::new(dir.path(), first_run_url(), policy)
}

fn configure_database(dir: &TempDir) {
    fs::write(dir.path().join(PREFS_FILE_NAME), "phi_dir \"/corpora/phi\"\n").unwrap();
}

// ----------------------------------------------------------------------------
// Navigation ordering
// ----------------------------------------------------------------------------

/// **VALUE**: Windows opened before the handshake wait, then load in creation order.
///
/// **WHY THIS MATTERS**: Loading `localhost` before the server listens shows a
/// connection error page.
///
/// **BUG THIS CATCHES**: Would catch navigating eagerly on `open()`, or
/// resolving pending windows in reverse.
#[test]
fn given_windows_before_ready_when_on_ready_then_navigated_in_order() {
    // GIVEN: Two windows opened while the server is pending
    let dir = TempDir::new().unwrap();
    configure_database(&dir);
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    assert!(!session.open(MockWindow::new("main", &log), NavTarget::Landing));
    assert!(!session.open(MockWindow::new("settings", &log), NavTarget::Settings));
    assert!(navigations(&log).is_empty(), "nothing loads before Ready");
    assert!(session.is_pending("main"));

    // WHEN: The handshake completes
    let loaded = session.on_ready(8080);

    // THEN: Both navigate, oldest first
    assert_eq!(loaded, 2);
    assert_eq!(
        navigations(&log),
        vec![
            ("main".to_string(), "http://localhost:8080/".to_string()),
            ("settings".to_string(), "http://localhost:8080/Settings.cgi".to_string()),
        ]
    );
    assert!(!session.is_pending("main"));
    assert_eq!(session.port(), Some(8080));
}

/// **VALUE**: Without a configured database the first window shows first-run setup.
#[test]
fn given_no_prefs_when_ready_then_first_window_shows_first_run_page() {
    // GIVEN: No preference file
    let dir = TempDir::new().unwrap();
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("main", &log), NavTarget::Landing);

    // WHEN: Ready
    session.on_ready(8080);

    // THEN: First-run page instead of the server home
    assert_eq!(
        navigations(&log),
        vec![("main".to_string(), first_run_url().to_string())]
    );
}

/// **VALUE**: After Ready, new windows navigate immediately.
#[test]
fn given_ready_session_when_window_opened_then_navigated_immediately() {
    // GIVEN: A ready session
    let dir = TempDir::new().unwrap();
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.on_ready(8080);

    // WHEN: Opening a window to the home page
    let navigated = session.open(MockWindow::new("window-2", &log), NavTarget::Home);

    // THEN: Navigated at once
    assert!(navigated);
    assert_eq!(
        navigations(&log),
        vec![("window-2".to_string(), "http://localhost:8080/".to_string())]
    );
}

/// **VALUE**: A failed handshake never loads a server URL into any window.
///
/// **BUG THIS CATCHES**: Would catch pending targets surviving `on_failed()`
/// and being loaded by a later, erroneous `on_ready()`.
#[test]
fn given_failed_handshake_when_ready_arrives_later_then_no_navigation() {
    // GIVEN: A pending window, then failure
    let dir = TempDir::new().unwrap();
    configure_database(&dir);
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("main", &log), NavTarget::Landing);
    session.on_failed();

    // WHEN: A stray Ready and a new window arrive
    let loaded = session.on_ready(8080);
    let navigated = session.open(MockWindow::new("late", &log), NavTarget::Home);
    let moved = session.navigate("main", NavTarget::Home);

    // THEN: Nothing ever navigated
    assert_eq!(loaded, 0);
    assert!(!navigated);
    assert!(!moved);
    assert!(navigations(&log).is_empty());
    assert_eq!(session.status(), ServerStatus::Failed);
}

/// **VALUE**: `on_ready` only takes effect once.
#[test]
fn given_ready_session_when_on_ready_again_then_ignored() {
    // GIVEN: A ready session with one window
    let dir = TempDir::new().unwrap();
    configure_database(&dir);
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("main", &log), NavTarget::Landing);
    session.on_ready(8080);

    // WHEN: A second Ready with another port
    let loaded = session.on_ready(9090);

    // THEN: Ignored
    assert_eq!(loaded, 0);
    assert_eq!(session.port(), Some(8080));
    assert_eq!(navigations(&log).len(), 1);
}

/// **VALUE**: Retargeting a pending window replaces what it will load.
#[test]
fn given_pending_window_when_navigate_then_pending_target_replaced() {
    // GIVEN: A pending window
    let dir = TempDir::new().unwrap();
    configure_database(&dir);
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("main", &log), NavTarget::Landing);

    // WHEN: Asking for the TLL download page before Ready
    session.navigate("main", NavTarget::TllDownload);
    session.on_ready(8080);

    // THEN: Only the last target loads
    assert_eq!(
        navigations(&log),
        vec![(
            "main".to_string(),
            "http://localhost:8080/tll-pdf-download.cgi".to_string()
        )]
    );
}

/// **VALUE**: Links opened in a new window are refused if remote.
#[test]
fn given_remote_link_when_opened_then_window_stays_blank() {
    // GIVEN: A ready session
    let dir = TempDir::new().unwrap();
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.on_ready(8080);

    // WHEN: Opening a remote and a local link
    let remote = Url::parse("https://example.org/").unwrap();
    let local = Url::parse("http://localhost:8080/Perseus.cgi?do=parse").unwrap();
    let remote_ok = session.open(MockWindow::new("w1", &log), NavTarget::Link(remote));
    let local_ok = session.open(MockWindow::new("w2", &log), NavTarget::Link(local.clone()));

    // THEN: Only the local link loads
    assert!(!remote_ok);
    assert!(local_ok);
    assert_eq!(navigations(&log), vec![("w2".to_string(), local.to_string())]);
}

// ----------------------------------------------------------------------------
// Close and quit policy
// ----------------------------------------------------------------------------

/// **VALUE**: Closing the last window quits everywhere except a resident platform.
#[test]
fn given_quit_policies_when_last_window_closed_then_quit_only_when_policy_says() {
    for (policy, expect_quit) in [
        (QuitPolicy::QuitOnLastWindow, true),
        (QuitPolicy::StayResident, false),
    ] {
        // GIVEN: Two tracked windows
        let dir = TempDir::new().unwrap();
        let log = call_log();
        let mut session = manager(&dir, policy);
        session.open(MockWindow::new("a", &log), NavTarget::Landing);
        session.open(MockWindow::new("b", &log), NavTarget::Landing);

        // WHEN: Closing both, and an unknown label
        let first = session.close("a");
        let unknown = session.close("zzz");
        let last = session.close("b");

        // THEN: Only the last close applies the policy
        assert_eq!(first, CloseOutcome::StillOpen { remaining: 1 });
        assert_eq!(unknown, CloseOutcome::Unknown);
        assert_eq!(last, CloseOutcome::LastClosed { quit: expect_quit });
        assert!(session.should_reopen());
    }
}

// ----------------------------------------------------------------------------
// Single instance
// ----------------------------------------------------------------------------

/// **VALUE**: A second launch restores and focuses the first window only.
///
/// **WHY THIS MATTERS**: The user double-clicked the app icon again; they
/// expect the existing window, not a second server.
///
/// **BUG THIS CATCHES**: Would catch focusing the most recent window, or
/// focusing without restoring a minimized one.
#[test]
fn given_minimized_first_window_when_focus_existing_then_restored_and_focused() {
    // GIVEN: Two windows, the first minimized
    let dir = TempDir::new().unwrap();
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("first", &log).minimized(), NavTarget::Landing);
    session.open(MockWindow::new("second", &log), NavTarget::Landing);

    // WHEN: A second instance is detected
    let focused = session.focus_existing();

    // THEN: The first window is restored then focused; the second untouched
    assert!(focused);
    assert_eq!(
        log.lock().unwrap().clone(),
        vec![
            ("first".to_string(), WindowCall::Unminimize),
            ("first".to_string(), WindowCall::Focus),
        ]
    );
    assert_eq!(session.window_count(), 2, "no window is created");
}

/// **VALUE**: A window that isn't minimized is only focused.
#[test]
fn given_visible_first_window_when_focus_existing_then_focused_only() {
    let dir = TempDir::new().unwrap();
    let log = call_log();
    let mut session = manager(&dir, QuitPolicy::QuitOnLastWindow);
    session.open(MockWindow::new("first", &log), NavTarget::Landing);

    assert!(session.focus_existing());
    assert_eq!(
        log.lock().unwrap().clone(),
        vec![("first".to_string(), WindowCall::Focus)]
    );
}

/// **VALUE**: With no tracked windows a second instance reports nothing to focus.
#[test]
fn given_no_windows_when_focus_existing_then_false() {
    let dir = TempDir::new().unwrap();
    let session = manager(&dir, QuitPolicy::StayResident);

    assert!(!session.focus_existing());
}

// ----------------------------------------------------------------------------
// AppSession end to end
// ----------------------------------------------------------------------------

/// **VALUE**: `init()` cleans up, watches, spawns, and the waiting window loads the server.
///
/// **WHY THIS MATTERS**: This is startup as the desktop app runs it, with a
/// shell script standing in for the server.
#[cfg(unix)]
#[tokio::test]
async fn given_stand_in_server_when_app_session_init_then_window_navigates_to_port() {
    use crate::helpers::{write_lock_file, write_server_script};
    use client_core::session::AppSession;
    use client_core::supervisor::LauncherSearch;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::time::timeout;

    // GIVEN: A stale lock file, a configured database and a stand-in server
    let dir = TempDir::new().unwrap();
    configure_database(&dir);
    write_lock_file(dir.path(), r#"{"port":9999,"pid":1}"#);
    let script = write_server_script(dir.path(), 8123);
    let mut search = LauncherSearch::new("/nonexistent/app", "/nonexistent/resources");
    search.program_override = Some(PathBuf::from("/bin/sh"));
    search.entry_point_override = Some(script);

    let log = call_log();
    let session: AppSession<MockWindow> =
        AppSession::new(dir.path(), search, first_run_url(), QuitPolicy::QuitOnLastWindow);
    session
        .windows()
        .open(MockWindow::new("main", &log), NavTarget::Landing);

    // WHEN: Initialising
    session.init().await.unwrap();
    let outcome = timeout(Duration::from_secs(10), session.handshake().outcome())
        .await
        .unwrap();

    // THEN: The new server's port, never the stale one, reached the window
    assert_eq!(outcome.map(|r| r.port), Ok(8123));
    assert_eq!(session.port(), Some(8123));
    assert_eq!(
        navigations(&log),
        vec![("main".to_string(), "http://localhost:8123/".to_string())]
    );

    // WHEN: Shutting down twice
    session.shutdown().await;
    session.shutdown().await;

    // THEN: Lock file removed
    assert!(session.is_shut_down());
    assert!(!client_core::lockfile::lock_file_path(dir.path()).exists());
}

/// **VALUE**: A launcher that can't be found fails `init()` and no window navigates.
#[tokio::test]
async fn given_missing_launcher_when_app_session_init_then_error_and_no_navigation() {
    use client_core::error::CoreError;
    use client_core::error::supervisor::SupervisorError;
    use client_core::session::AppSession;
    use client_core::supervisor::LauncherSearch;

    // GIVEN: A session whose launcher override doesn't exist
    let dir = TempDir::new().unwrap();
    let mut search = LauncherSearch::new("/nonexistent/app", "/nonexistent/resources");
    search.program_override = Some(dir.path().join("no-such-perl"));
    let log = call_log();
    let session: AppSession<MockWindow> =
        AppSession::new(dir.path(), search, first_run_url(), QuitPolicy::QuitOnLastWindow);
    session
        .windows()
        .open(MockWindow::new("main", &log), NavTarget::Landing);

    // WHEN: Initialising
    let result = session.init().await;

    // THEN: Startup-fatal launcher error, nothing loaded
    assert!(
        matches!(
            result,
            Err(CoreError::Supervisor(SupervisorError::LauncherNotFound { .. }))
        ),
        "{result:?}"
    );
    assert!(navigations(&log).is_empty());
}
