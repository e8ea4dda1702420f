use client_core::error::lockfile::LockFileError;
use client_core::lockfile;

use std::fs;

use tempfile::TempDir;

/// **VALUE**: A lock file that can't be read reports the caller's location.
///
/// **WHY THIS MATTERS**: `read` is public API. The location should name the
/// code that asked for the file, not the lockfile module.
#[test]
fn given_unreadable_lock_file_when_read_then_error_points_at_caller() {
    // GIVEN: A directory in place of the lock file
    let dir = TempDir::new().unwrap();
    let path = lockfile::lock_file_path(dir.path());
    fs::create_dir(&path).unwrap();

    // WHEN: Reading it
    let err = lockfile::read(&path).unwrap_err();

    // THEN: A read error located in this test file
    assert!(matches!(err, LockFileError::Read { .. }));
    let error_string = err.to_string();
    assert!(error_string.contains("Lock File Read Error"));
    assert!(error_string.contains("integration_tests"), "{error_string}");
}
