// Unit tests for the handshake state machine, independent of any OS watcher
// Tests against a real directory watch are in integration_tests/handshake.rs

use crate::LOCK_FILE_NAME;
use crate::handshake::{Handshake, HandshakeFailure, HandshakeState};
use crate::lockfile::LockFileRecord;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
use tempfile::TempDir;

fn create() -> EventKind {
    EventKind::Create(CreateKind::File)
}

fn modify() -> EventKind {
    EventKind::Modify(ModifyKind::Data(DataChange::Content))
}

fn watching(dir: &Path) -> (Handshake, PathBuf) {
    let lock_path = dir.join(LOCK_FILE_NAME);
    let mut handshake = Handshake::new(&lock_path);
    assert!(handshake.begin());
    (handshake, lock_path)
}

/// **VALUE**: The machine starts Idle and `begin()` only works once.
///
/// **BUG THIS CATCHES**: Would catch a second `begin()` resetting a finished
/// handshake back to Watching, which would allow a second publish.
#[test]
fn given_idle_handshake_when_begin_called_twice_then_second_is_refused() {
    // GIVEN: A fresh handshake
    let dir = TempDir::new().unwrap();
    let mut handshake = Handshake::new(dir.path().join(LOCK_FILE_NAME));
    assert_eq!(handshake.state(), &HandshakeState::Idle);

    // WHEN: Beginning twice
    let first = handshake.begin();
    let second = handshake.begin();

    // THEN: Only the first transitions
    assert!(first);
    assert!(!second);
    assert_eq!(handshake.state(), &HandshakeState::Watching);
}

/// **VALUE**: A complete lock file moves Watching to Ready with its exact values.
///
/// **WHY THIS MATTERS**: This is the moment windows get a URL. The port must be
/// the one the server wrote.
#[test]
fn given_complete_lock_file_when_create_event_then_ready_with_record() {
    // GIVEN: A watching handshake and a complete lock file
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, r#"{"port":8080,"pid":4242}"#).unwrap();

    // WHEN: The create event arrives
    let outcome = handshake.on_fs_event(&create(), &[lock_path]);

    // THEN: Ready with port 8080 and pid 4242
    let expected = LockFileRecord {
        port: 8080,
        pid: 4242,
    };
    assert_eq!(outcome, Some(Ok(expected)));
    assert_eq!(handshake.state(), &HandshakeState::Ready(expected));
}

/// **VALUE**: Events for other files in the settings directory are ignored.
///
/// **BUG THIS CATCHES**: Would catch filtering by directory only, which would
/// probe the lock file every time window state or preferences are saved.
#[test]
fn given_other_filename_when_event_then_state_unchanged() {
    // GIVEN: A watching handshake, and a lock file that already exists
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, r#"{"port":8080,"pid":4242}"#).unwrap();

    // WHEN: An event names a different file
    let outcome = handshake.on_fs_event(&modify(), &[dir.path().join("windowstate.json")]);

    // THEN: No transition
    assert_eq!(outcome, None);
    assert_eq!(handshake.state(), &HandshakeState::Watching);
}

/// **VALUE**: Only create and modify events count.
///
/// **BUG THIS CATCHES**: A remove event (stale cleanup deleting the old file)
/// or an access event must never be taken as readiness.
#[test]
fn given_remove_or_access_event_when_event_then_state_unchanged() {
    // GIVEN: A watching handshake and a valid lock file on disk
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, r#"{"port":8080,"pid":4242}"#).unwrap();
    let paths = [lock_path];

    // WHEN: Remove and access events arrive
    let removed = handshake.on_fs_event(&EventKind::Remove(RemoveKind::File), &paths);
    let accessed = handshake.on_fs_event(&EventKind::Access(AccessKind::Any), &paths);

    // THEN: Neither transitions
    assert_eq!(removed, None);
    assert_eq!(accessed, None);
    assert_eq!(handshake.state(), &HandshakeState::Watching);
}

/// **VALUE**: A freshly created, still empty lock file keeps us watching.
///
/// **WHY THIS MATTERS**: Creation and the first write are separate events on
/// most platforms. Failing on the create event would abort every startup.
#[test]
fn given_empty_lock_file_when_create_event_then_still_watching() {
    // GIVEN: A watching handshake and an empty lock file
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, "").unwrap();

    // WHEN: The create event arrives, then the contents are written
    let on_create = handshake.on_fs_event(&create(), std::slice::from_ref(&lock_path));
    fs::write(&lock_path, "port 8080\npid 4242\n").unwrap();
    let on_modify = handshake.on_fs_event(&modify(), &[lock_path]);

    // THEN: Create is ignored and the modify completes the handshake
    assert_eq!(on_create, None);
    assert_eq!(
        on_modify,
        Some(Ok(LockFileRecord {
            port: 8080,
            pid: 4242
        }))
    );
}

/// **VALUE**: A lock file missing `pid` fails the handshake.
///
/// **BUG THIS CATCHES**: Would catch accepting a port without a pid, which
/// leaves nothing to signal at the next startup's stale cleanup.
#[test]
fn given_lock_file_without_pid_when_event_then_failed_corrupt() {
    // GIVEN: A lock file with only a port
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, r#"{"port":8080}"#).unwrap();

    // WHEN: The event arrives
    let outcome = handshake.on_fs_event(&create(), &[lock_path]);

    // THEN: Failed with a corrupt classification
    assert!(matches!(outcome, Some(Err(HandshakeFailure::Corrupt { .. }))));
    assert!(matches!(
        handshake.state(),
        HandshakeState::Failed(HandshakeFailure::Corrupt { .. })
    ));
}

/// **VALUE**: Once terminal, nothing moves the machine again.
///
/// **WHY THIS MATTERS**: The server rewrites files in the settings directory
/// while it runs. A second transition would publish a second port.
///
/// **BUG THIS CATCHES**: Would catch a guard that only checks for Ready and lets
/// a later timeout overwrite it, or a rewrite that republishes.
#[test]
fn given_ready_handshake_when_more_events_and_timeout_then_no_transition() {
    // GIVEN: A handshake that already reached Ready
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, r#"{"port":8080,"pid":4242}"#).unwrap();
    let paths = [lock_path.clone()];
    assert!(handshake.on_fs_event(&create(), &paths).is_some());

    // WHEN: The file is rewritten, and then a timeout and a server exit arrive
    fs::write(&lock_path, r#"{"port":9090,"pid":5555}"#).unwrap();
    let rewrite = handshake.on_fs_event(&modify(), &paths);
    let timeout = handshake.on_timeout(Duration::from_secs(30));
    let exited = handshake.on_server_exit("exit status: 0");

    // THEN: None produce an outcome and the original record stands
    assert_eq!(rewrite, None);
    assert_eq!(timeout, None);
    assert_eq!(exited, None);
    assert_eq!(
        handshake.state().record(),
        Some(LockFileRecord {
            port: 8080,
            pid: 4242
        })
    );
}

/// **VALUE**: Timeout while watching is a startup-fatal failure.
#[test]
fn given_watching_handshake_when_timeout_then_failed_timed_out() {
    // GIVEN: A watching handshake with no lock file
    let dir = TempDir::new().unwrap();
    let (mut handshake, _) = watching(dir.path());

    // WHEN: The deadline passes
    let outcome = handshake.on_timeout(Duration::from_secs(30));

    // THEN: Failed with the elapsed duration
    assert_eq!(
        outcome,
        Some(Err(HandshakeFailure::TimedOut {
            after: Duration::from_secs(30)
        }))
    );
    assert!(handshake.state().is_terminal());
}

/// **VALUE**: A timeout before `begin()` does nothing.
///
/// **BUG THIS CATCHES**: Would catch `finish` accepting transitions from Idle.
#[test]
fn given_idle_handshake_when_timeout_then_still_idle() {
    // GIVEN: An idle handshake
    let dir = TempDir::new().unwrap();
    let mut handshake = Handshake::new(dir.path().join(LOCK_FILE_NAME));

    // WHEN/THEN: Timeout is ignored
    assert_eq!(handshake.on_timeout(Duration::from_secs(1)), None);
    assert_eq!(handshake.state(), &HandshakeState::Idle);
}

/// **VALUE**: A server that wrote its lock file and then exited still counts as ready.
///
/// **WHY THIS MATTERS**: The exit notification and the directory event race.
/// If the exit is seen first, the file on disk must win.
#[test]
fn given_lock_file_on_disk_when_server_exit_then_ready() {
    // GIVEN: A watching handshake and a complete lock file whose event is not yet seen
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, "pid 4242\nport 8080\n").unwrap();

    // WHEN: The exit notification arrives first
    let outcome = handshake.on_server_exit("exit status: 0");

    // THEN: The record on disk is used
    assert_eq!(
        outcome,
        Some(Ok(LockFileRecord {
            port: 8080,
            pid: 4242
        }))
    );
}

/// **VALUE**: A server that dies before writing anything fails fast.
#[test]
fn given_no_lock_file_when_server_exit_then_failed_server_exited() {
    // GIVEN: A watching handshake and no lock file
    let dir = TempDir::new().unwrap();
    let (mut handshake, _) = watching(dir.path());

    // WHEN: The server exits
    let outcome = handshake.on_server_exit("exit status: 2");

    // THEN: Failed, carrying the status
    assert_eq!(
        outcome,
        Some(Err(HandshakeFailure::ServerExited {
            status: String::from("exit status: 2")
        }))
    );
}

/// **VALUE**: A lock file that isn't UTF-8 fails the handshake as corrupt.
///
/// **BUG THIS CATCHES**: Would catch treating every read error as "not
/// written yet", which leaves the machine Watching until the timeout fires
/// with the wrong cause, or forever when the timeout is disabled.
#[test]
fn given_non_utf8_lock_file_when_create_event_then_failed_corrupt() {
    // GIVEN: A watching handshake and a lock file holding invalid UTF-8
    let dir = TempDir::new().unwrap();
    let (mut handshake, lock_path) = watching(dir.path());
    fs::write(&lock_path, [0xff, 0xfe, b'p', b'o']).unwrap();

    // WHEN: The create event arrives
    let outcome = handshake.on_fs_event(&create(), &[lock_path]);

    // THEN: Failed with a corrupt-file reason
    assert!(matches!(
        outcome,
        Some(Err(HandshakeFailure::Corrupt { .. }))
    ));
    assert!(matches!(
        handshake.state(),
        HandshakeState::Failed(HandshakeFailure::Corrupt { .. })
    ));
}
