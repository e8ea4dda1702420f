use client_core::error::supervisor::SupervisorError;
use client_core::lockfile;
use client_core::supervisor::{LauncherSearch, ServerSupervisor, StaleCleanup, StaleKill};

use crate::helpers::write_lock_file;

use std::path::PathBuf;

use tempfile::TempDir;

// ============================================================================
// Public API tests for the process supervisor
// ============================================================================

fn search_with(program: Option<PathBuf>, script: Option<PathBuf>) -> LauncherSearch {
    let mut search = LauncherSearch::new("/nonexistent/app", "/nonexistent/resources");
    search.program_override = program;
    search.entry_point_override = script;
    search
}

/// **VALUE**: A stale lock file is removed even when its pid cannot be signalled.
///
/// **WHY THIS MATTERS**: A previous run that crashed leaves its lock file.
/// If it survived into the new session the watcher could read the old port.
///
/// **BUG THIS CATCHES**: Would catch cleanup bailing out early when the kill is
/// refused, and a guard that lets pid 1 be signalled.
#[tokio::test]
async fn given_stale_lock_file_with_pid_1_when_cleanup_then_refused_and_removed() {
    // GIVEN: A stale lock file naming pid 1
    let dir = TempDir::new().unwrap();
    let lock_path = write_lock_file(dir.path(), r#"{"port":9999,"pid":1}"#);
    let supervisor = ServerSupervisor::new(dir.path(), search_with(None, None));

    // WHEN: Running stale cleanup
    let cleanup = supervisor.cleanup_stale().await;

    // THEN: pid 1 was refused and the file is gone
    assert_eq!(
        cleanup,
        StaleCleanup::Removed {
            pid: Some(1),
            kill: Some(StaleKill::Refused)
        }
    );
    assert!(!lock_path.exists());
}

/// **VALUE**: A stale pid that no longer exists is reported and the file removed.
#[tokio::test]
async fn given_stale_lock_file_with_dead_pid_when_cleanup_then_not_running_and_removed() {
    // GIVEN: A lock file naming a pid that cannot exist
    let dir = TempDir::new().unwrap();
    let lock_path = write_lock_file(dir.path(), "port 9999\npid 4000000000\n");
    let supervisor = ServerSupervisor::new(dir.path(), search_with(None, None));

    // WHEN: Running stale cleanup
    let cleanup = supervisor.cleanup_stale().await;

    // THEN: Nothing to kill, file removed
    assert_eq!(
        cleanup,
        StaleCleanup::Removed {
            pid: Some(4_000_000_000),
            kill: Some(StaleKill::NotRunning)
        }
    );
    assert!(!lock_path.exists());
}

/// **VALUE**: A corrupt stale lock file is still removed.
#[tokio::test]
async fn given_corrupt_stale_lock_file_when_cleanup_then_removed_without_kill() {
    // GIVEN: Garbage in the lock file
    let dir = TempDir::new().unwrap();
    let lock_path = write_lock_file(dir.path(), "\u{0}\u{1}garbage");
    let supervisor = ServerSupervisor::new(dir.path(), search_with(None, None));

    // WHEN: Running stale cleanup
    let cleanup = supervisor.cleanup_stale().await;

    // THEN: No pid, no kill attempt, file removed
    assert_eq!(cleanup, StaleCleanup::Removed { pid: None, kill: None });
    assert!(!lock_path.exists());
}

/// **VALUE**: No lock file means nothing to clean.
#[tokio::test]
async fn given_no_lock_file_when_cleanup_then_no_lock_file() {
    let dir = TempDir::new().unwrap();
    let supervisor = ServerSupervisor::new(dir.path(), search_with(None, None));

    assert_eq!(supervisor.cleanup_stale().await, StaleCleanup::NoLockFile);
}

/// **VALUE**: A missing launcher is a typed, startup-fatal error.
///
/// **BUG THIS CATCHES**: Would catch `start()` panicking, or spawning with a
/// nonexistent path and failing later with an opaque io error.
#[tokio::test]
async fn given_missing_launcher_when_start_then_launcher_not_found() {
    // GIVEN: An interpreter override that doesn't exist
    let dir = TempDir::new().unwrap();
    let mut supervisor = ServerSupervisor::new(
        dir.path(),
        search_with(Some(dir.path().join("no-such-perl")), None),
    );

    // WHEN: Starting
    let result = supervisor.start().await;

    // THEN: LauncherNotFound listing what was searched
    match result {
        Err(SupervisorError::LauncherNotFound { searched, .. }) => {
            assert_eq!(searched, vec![dir.path().join("no-such-perl")]);
        }
        other => panic!("expected LauncherNotFound, got {other:?}"),
    }
    assert!(!supervisor.is_running());
}

/// **VALUE**: A missing server script is reported separately from a missing launcher.
#[cfg(unix)]
#[tokio::test]
async fn given_missing_entry_point_when_start_then_entry_point_not_found() {
    // GIVEN: A real interpreter but no script
    let dir = TempDir::new().unwrap();
    let mut supervisor = ServerSupervisor::new(
        dir.path(),
        search_with(
            Some(PathBuf::from("/bin/sh")),
            Some(dir.path().join("missing.pl")),
        ),
    );

    // WHEN/THEN: EntryPointNotFound
    let result = supervisor.start().await;
    assert!(
        matches!(result, Err(SupervisorError::EntryPointNotFound { .. })),
        "{result:?}"
    );
}

/// **VALUE**: Full lifecycle with a stand-in server: stale cleanup, spawn, handshake file, stop.
///
/// **WHY THIS MATTERS**: The stale file must be gone before the new server
/// writes its own, and `stop()` must both end the process and delete the file.
#[cfg(unix)]
#[tokio::test]
async fn given_stale_lock_file_when_start_and_stop_then_fresh_lock_file_then_cleaned_up() {
    use crate::helpers::write_server_script;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    // GIVEN: A stale lock file and a stand-in server script
    let dir = TempDir::new().unwrap();
    let lock_path = write_lock_file(dir.path(), r#"{"port":9999,"pid":1}"#);
    let script = write_server_script(dir.path(), 8080);
    let mut supervisor = ServerSupervisor::new(
        dir.path(),
        search_with(Some(PathBuf::from("/bin/sh")), Some(script)),
    );

    // WHEN: Starting
    let pid = supervisor.start().await.unwrap();

    // THEN: Eventually the lock file holds the new server's port and pid
    let record = timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(Some(record)) = lockfile::read(&lock_path) {
                return record;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(record.port, 8080);
    assert_eq!(record.pid, pid);
    assert!(supervisor.is_running());

    // WHEN: Starting again while running
    let again = supervisor.start().await;

    // THEN: Refused
    assert!(matches!(again, Err(SupervisorError::AlreadyRunning { .. })));

    // WHEN: Stopping
    let exit_watch = supervisor.handle().unwrap().exit_watch();
    supervisor.stop().await;

    // THEN: Process exited and the lock file is gone
    assert!(exit_watch.borrow().is_some(), "exit status should be published");
    assert!(!lock_path.exists());
    assert!(!supervisor.is_running());
}

/// **VALUE**: `stop()` tolerates a server that already exited and a missing lock file.
#[cfg(unix)]
#[tokio::test]
async fn given_exited_server_when_stop_then_no_error() {
    use crate::helpers::write_crashing_script;
    use std::time::Duration;
    use tokio::time::timeout;

    // GIVEN: A server that exits immediately
    let dir = TempDir::new().unwrap();
    let script = write_crashing_script(dir.path());
    let mut supervisor = ServerSupervisor::new(
        dir.path(),
        search_with(Some(PathBuf::from("/bin/sh")), Some(script)),
    );
    supervisor.start().await.unwrap();
    let mut exit_watch = supervisor.handle().unwrap().exit_watch();
    timeout(Duration::from_secs(10), exit_watch.wait_for(Option::is_some))
        .await
        .unwrap()
        .unwrap();

    // WHEN: Stopping twice
    supervisor.stop().await;
    supervisor.stop().await;

    // THEN: Nothing left behind
    assert!(!supervisor.is_running());
    assert!(!lockfile::lock_file_path(dir.path()).exists());
}
