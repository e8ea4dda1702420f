use client_core::error::handshake::HandshakeError;
use client_core::handshake::{HandshakeFailure, HandshakeOutcome, HandshakeState, HandshakeWatcher};
use client_core::lockfile::LockFileRecord;

use crate::helpers::write_lock_file;

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(10);

type Seen = Arc<Mutex<Vec<(usize, Result<u16, HandshakeFailure>)>>>;

fn record_into(seen: &Seen, id: usize) -> impl FnOnce(&HandshakeOutcome) + Send + 'static {
    let seen = Arc::clone(seen);
    move |outcome: &HandshakeOutcome| {
        seen.lock()
            .unwrap()
            .push((id, outcome.clone().map(|r| r.port)));
    }
}

/// **VALUE**: Writing the lock file after `start()` completes the handshake.
///
/// **WHY THIS MATTERS**: This is the whole startup path: an empty settings
/// directory, a server that writes `{"port":8080,"pid":4242}`, and windows
/// waiting to be told the port.
#[tokio::test]
async fn given_empty_settings_dir_when_lock_file_written_then_ready_with_port() {
    // GIVEN: A watcher on an empty settings directory
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(Some(WAIT)).unwrap();
    assert_eq!(watcher.state(), HandshakeState::Watching);

    // WHEN: The server writes its lock file
    write_lock_file(dir.path(), r#"{"port":8080,"pid":4242}"#);

    // THEN: Ready with the written values
    let outcome = timeout(WAIT, watcher.outcome()).await.unwrap();
    assert_eq!(outcome, Ok(LockFileRecord { port: 8080, pid: 4242 }));
    assert_eq!(
        watcher.state(),
        HandshakeState::Ready(LockFileRecord { port: 8080, pid: 4242 })
    );
}

/// **VALUE**: Subscribers are called once each, in registration order.
///
/// **BUG THIS CATCHES**: Would catch subscribers stored in a map (losing order)
/// or called once per matching filesystem event.
#[tokio::test]
async fn given_subscribers_when_ready_then_each_called_once_in_order() {
    // GIVEN: Three subscribers registered before the handshake completes
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    for id in 0..3 {
        watcher.subscribe(record_into(&seen, id));
    }
    watcher.start(Some(WAIT)).unwrap();

    // WHEN: The lock file appears, then is rewritten and a neighbour file changes
    let lock_path = write_lock_file(dir.path(), "port 8080\npid 4242\n");
    timeout(WAIT, watcher.outcome()).await.unwrap().unwrap();
    fs::write(&lock_path, r#"{"port":9999,"pid":1}"#).unwrap();
    fs::write(dir.path().join("windowstate.json"), "{}").unwrap();
    sleep(Duration::from_millis(300)).await;

    // THEN: One call per subscriber, in order, all with the first port
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(0, Ok(8080)), (1, Ok(8080)), (2, Ok(8080))]);
    assert_eq!(watcher.state().record().map(|r| r.port), Some(8080));
}

/// **VALUE**: A subscriber registered while the outcome is being published
/// runs after every subscriber that was already waiting.
///
/// **BUG THIS CATCHES**: Would catch `subscribe` seeing the terminal state
/// mid-publication and running its callback ahead of the queue.
#[tokio::test]
async fn given_subscriber_that_subscribes_when_ready_then_new_one_runs_last() {
    // GIVEN: A first subscriber that registers another, then two more behind it
    let dir = TempDir::new().unwrap();
    let watcher = Arc::new(HandshakeWatcher::new(dir.path()));
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    {
        let weak = Arc::downgrade(&watcher);
        let seen_by_first = Arc::clone(&seen);
        let seen_by_late = Arc::clone(&seen);
        watcher.subscribe(move |outcome| {
            record_into(&seen_by_first, 0)(outcome);
            if let Some(watcher) = weak.upgrade() {
                watcher.subscribe(record_into(&seen_by_late, 9));
            }
        });
    }
    watcher.subscribe(record_into(&seen, 1));
    watcher.subscribe(record_into(&seen, 2));
    watcher.start(Some(WAIT)).unwrap();

    // WHEN: The lock file appears
    write_lock_file(dir.path(), r#"{"port":8080,"pid":4242}"#);
    timeout(WAIT, watcher.outcome()).await.unwrap().unwrap();

    // THEN: The late subscriber ran once, after the others
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(0, Ok(8080)), (1, Ok(8080)), (2, Ok(8080)), (9, Ok(8080))]);
}

/// **VALUE**: A subscriber that arrives after the outcome is called immediately.
///
/// **WHY THIS MATTERS**: Windows created after startup still need the port.
#[tokio::test]
async fn given_ready_handshake_when_late_subscriber_then_called_immediately() {
    // GIVEN: A completed handshake
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(Some(WAIT)).unwrap();
    write_lock_file(dir.path(), r#"{"port":8080,"pid":4242}"#);
    timeout(WAIT, watcher.outcome()).await.unwrap().unwrap();

    // WHEN: Subscribing now
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    watcher.subscribe(record_into(&seen, 7));

    // THEN: Called synchronously, before subscribe returned
    assert_eq!(seen.lock().unwrap().clone(), vec![(7, Ok(8080))]);
}

/// **VALUE**: A lock file without a pid fails the handshake.
#[tokio::test]
async fn given_lock_file_without_pid_when_written_then_failed_corrupt() {
    // GIVEN: A watching handshake
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(Some(WAIT)).unwrap();

    // WHEN: A lock file without pid appears
    write_lock_file(dir.path(), r#"{"port":8080}"#);

    // THEN: Failed as corrupt
    let outcome = timeout(WAIT, watcher.outcome()).await.unwrap();
    assert!(
        matches!(outcome, Err(HandshakeFailure::Corrupt { .. })),
        "{outcome:?}"
    );
}

/// **VALUE**: No lock file within the timeout fails the handshake.
#[tokio::test]
async fn given_no_lock_file_when_timeout_elapses_then_failed_timed_out() {
    // GIVEN: A watcher with a short timeout
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(Some(Duration::from_millis(200))).unwrap();

    // WHEN: Nothing is written
    let outcome = timeout(WAIT, watcher.outcome()).await.unwrap();

    // THEN: Timed out
    assert_eq!(
        outcome,
        Err(HandshakeFailure::TimedOut {
            after: Duration::from_millis(200)
        })
    );
}

/// **VALUE**: Starting twice is refused.
#[tokio::test]
async fn given_started_watcher_when_started_again_then_already_started_error() {
    // GIVEN: A started watcher
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(None).unwrap();

    // WHEN: Starting again
    let result = watcher.start(None);

    // THEN: Refused, still watching
    assert!(matches!(result, Err(HandshakeError::AlreadyStarted { .. })));
    assert_eq!(watcher.state(), HandshakeState::Watching);
}

/// **VALUE**: Watching a directory that doesn't exist is reported, not panicked.
#[tokio::test]
async fn given_missing_settings_dir_when_started_then_watch_error() {
    // GIVEN: A path that doesn't exist
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path().join("missing"));

    // WHEN: Starting
    let result = watcher.start(None);

    // THEN: A watch error naming the path
    assert!(matches!(result, Err(HandshakeError::Watch { .. })), "{result:?}");
}

/// **VALUE**: A server that dies before writing its lock file fails the handshake early.
///
/// **WHY THIS MATTERS**: Without this the user stares at a blank window until the
/// timeout, or forever when the timeout is disabled.
#[cfg(unix)]
#[tokio::test]
async fn given_server_exit_before_lock_file_when_watching_then_failed_server_exited() {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use tokio::sync::watch;

    // GIVEN: A watcher with no timeout following a server's exit channel
    let dir = TempDir::new().unwrap();
    let watcher = HandshakeWatcher::new(dir.path());
    watcher.start(None).unwrap();
    let (exit_tx, exit_rx) = watch::channel(None);
    watcher.watch_server_exit(exit_rx);

    // WHEN: The server exits with status 3
    exit_tx.send_replace(Some(ExitStatus::from_raw(3 << 8)));

    // THEN: Failed with the exit status
    let outcome = timeout(WAIT, watcher.outcome()).await.unwrap();
    match outcome {
        Err(HandshakeFailure::ServerExited { status }) => assert!(status.contains('3'), "{status}"),
        other => panic!("expected ServerExited, got {other:?}"),
    }
}
