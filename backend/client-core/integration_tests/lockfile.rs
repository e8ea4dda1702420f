use client_core::error::lockfile::LockFileError;
use client_core::lockfile::{self, LockFileRecord};

use crate::helpers::write_lock_file;

use tempfile::TempDir;

// ============================================================================
// Public API tests for lock file parsing and storage
// ============================================================================

/// **VALUE**: The JSON form the current server writes parses to its exact values.
#[test]
fn given_json_lock_file_when_parsed_then_returns_port_and_pid() {
    // GIVEN: JSON contents as written by the server
    let contents = r#"{"port":8080,"pid":4242}"#;

    // WHEN: Parsing
    let record = LockFileRecord::parse(contents).unwrap();

    // THEN: Exact values
    assert_eq!(record, LockFileRecord { port: 8080, pid: 4242 });
}

/// **VALUE**: Both historical formats are accepted, including string-typed JSON numbers.
///
/// **WHY THIS MATTERS**: Which format a deployed server emits is outside our
/// control; rejecting either one would hang startup on that deployment.
#[test]
fn given_each_historical_format_when_parsed_then_same_record() {
    // GIVEN: The same record in every accepted shape
    let shapes = [
        r#"{"port":8080,"pid":4242}"#,
        r#"{"port":"8080","pid":"4242"}"#,
        "{\n  \"pid\": 4242,\n  \"port\": 8080,\n  \"host\": \"localhost\"\n}\n",
        "port 8080\npid 4242\n",
        "pid 4242\r\nport 8080\r\n",
    ];

    // WHEN/THEN: All parse to port 8080, pid 4242
    for shape in shapes {
        let record = LockFileRecord::parse(shape)
            .unwrap_or_else(|e| panic!("{shape:?} should parse: {e}"));
        assert_eq!(record, LockFileRecord { port: 8080, pid: 4242 }, "{shape:?}");
    }
}

/// **VALUE**: Records missing a field, or with unusable values, are corrupt.
///
/// **BUG THIS CATCHES**: Would catch a parser that defaults a missing pid to 0,
/// or silently truncates a port above 65535.
#[test]
fn given_incomplete_or_invalid_contents_when_parsed_then_parse_error() {
    // GIVEN: Contents that must never be trusted
    let corrupt = [
        "",
        "   \n",
        r#"{"port":8080}"#,
        r#"{"pid":4242}"#,
        r#"{"port":70000,"pid":4242}"#,
        r#"{"port":0,"pid":4242}"#,
        r#"{"port":8080,"pid":"abc"}"#,
        r#"[8080, 4242]"#,
        "{not json",
        "port 8080\n",
        "port 8080\npid 4242\nhost localhost\n",
        "port: 8080\npid: 4242\n",
    ];

    // WHEN/THEN: Every one is a parse error
    for contents in corrupt {
        let result = LockFileRecord::parse(contents);
        assert!(
            matches!(result, Err(LockFileError::Parse { .. })),
            "{contents:?} should be corrupt, got {result:?}"
        );
    }
}

/// **VALUE**: A record written with `to_json()` is read back by `read()`.
#[test]
fn given_record_on_disk_when_read_then_returns_record() {
    // GIVEN: A lock file written from a record
    let dir = TempDir::new().unwrap();
    let record = LockFileRecord { port: 51234, pid: 777 };
    let path = write_lock_file(dir.path(), &record.to_json());

    // WHEN: Reading it
    let read = lockfile::read(&path).unwrap();

    // THEN: Same record
    assert_eq!(read, Some(record));
}

/// **VALUE**: A missing lock file is "not yet", not an error.
#[test]
fn given_no_lock_file_when_read_then_returns_none() {
    // GIVEN: An empty settings directory
    let dir = TempDir::new().unwrap();

    // WHEN: Reading the lock file path
    let read = lockfile::read(&lockfile::lock_file_path(dir.path())).unwrap();

    // THEN: None
    assert_eq!(read, None);
}

/// **VALUE**: Removing a lock file twice succeeds both times.
///
/// **WHY THIS MATTERS**: Shutdown always tries to delete the lock file, and the
/// server may already have done so.
#[test]
fn given_lock_file_when_removed_twice_then_second_reports_absent() {
    // GIVEN: A lock file
    let dir = TempDir::new().unwrap();
    let path = write_lock_file(dir.path(), r#"{"port":8080,"pid":4242}"#);

    // WHEN: Removing it twice
    let first = lockfile::remove(&path).unwrap();
    let second = lockfile::remove(&path).unwrap();

    // THEN: Deleted once, tolerated once
    assert!(first);
    assert!(!second);
    assert!(!path.exists());
}
