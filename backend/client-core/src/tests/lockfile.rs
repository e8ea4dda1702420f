// Unit tests for lockfile module internals
// Integration tests for the public API are in integration_tests/lockfile.rs

use crate::lockfile::{LockFileRecord, get_line_regex, stale_pid};

use std::fs;

use tempfile::TempDir;

/// **VALUE**: Pins the shape of a legacy `key value` line.
///
/// **WHY THIS MATTERS**: Older servers write `port 8080` on its own line. If the
/// line regex loosens, `port=8080` or trailing junk would be accepted and a
/// half-written file could produce a bogus port.
///
/// **BUG THIS CATCHES**: Would catch a pattern change that drops the `^...$`
/// anchors or the named `key`/`value` groups the parser indexes by name.
#[test]
fn given_legacy_lines_when_line_regex_applied_then_only_key_space_value_matches() {
    // GIVEN: The compiled line regex
    let re = get_line_regex();

    // WHEN/THEN: A well-formed line captures key and value
    let caps = re.captures("port 8080").expect("should match");
    assert_eq!(&caps["key"], "port");
    assert_eq!(&caps["value"], "8080");

    // THEN: Malformed lines do not match
    for line in ["port=8080", "port 8080 extra", "port", " 8080", "port\t"] {
        assert!(re.captures(line).is_none(), "should not match: {line:?}");
    }
}

/// **VALUE**: Stale cleanup still finds a pid in a corrupt lock file.
///
/// **WHY THIS MATTERS**: A server killed mid-write leaves a file with a pid but
/// no port. Strict parsing would reject it and the old server would keep its
/// port forever.
///
/// **BUG THIS CATCHES**: Would catch `stale_pid` delegating to the strict
/// parser only.
#[test]
fn given_lock_file_without_port_when_stale_pid_called_then_returns_pid() {
    // GIVEN: Lock files that hold only a pid, in both formats
    let dir = TempDir::new().unwrap();
    let json = dir.path().join("json.lock");
    let lines = dir.path().join("lines.lock");
    fs::write(&json, r#"{"pid": 4242}"#).unwrap();
    fs::write(&lines, "pid 4343\n").unwrap();

    // WHEN: Extracting the stale pid
    // THEN: Both yield the pid even though neither is a valid record
    assert!(LockFileRecord::parse(&fs::read_to_string(&json).unwrap()).is_err());
    assert_eq!(stale_pid(&json), Some(4242));
    assert_eq!(stale_pid(&lines), Some(4343));
}

/// **VALUE**: A pid of zero is never reported as stale.
///
/// **BUG THIS CATCHES**: Signalling pid 0 sends the signal to our whole
/// process group, including the shell itself.
#[test]
fn given_zero_pid_when_stale_pid_called_then_returns_none() {
    // GIVEN: A lock file recording pid 0
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zero.lock");
    fs::write(&path, r#"{"port": 8080, "pid": 0}"#).unwrap();

    // WHEN/THEN: No pid is offered for signalling
    assert_eq!(stale_pid(&path), None);
}
