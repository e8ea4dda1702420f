use client_core::bridge::BridgeError;
use client_core::error::prefs::PrefsError;
use client_core::PREFS_FILE_NAME;
use client_core::prefs::{DatabaseKind, PreferenceStore};

use std::fs;
use std::str::FromStr;

use tempfile::TempDir;

/// **VALUE**: Verifies that parse failures of a database name carry a location.
///
/// **WHY THIS MATTERS**: An unknown name means a page sent a bad request;
/// the location points at the parse site rather than the page.
#[test]
fn given_unknown_database_name_when_parsed_then_error_names_it_with_location() {
    // GIVEN/WHEN: Parsing a name that isn't a database
    let err = DatabaseKind::from_str("LSJ").unwrap_err();

    // THEN: Variant, the offending name and a file location
    assert!(matches!(err, PrefsError::UnknownDatabase { .. }));
    let error_string = err.to_string();
    assert!(error_string.contains("Unknown Database Error"));
    assert!(error_string.contains("'LSJ'"));
    assert!(error_string.contains(".rs:"));
}

/// **VALUE**: `BridgeError::NotReady` records where it was raised.
#[test]
fn given_not_ready_when_formatted_then_includes_location() {
    // GIVEN: A NotReady error raised here
    let err = BridgeError::not_ready();

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: Location points at this file
    assert!(error_string.contains("Server Not Ready Error"));
    assert!(error_string.contains("prefs.rs"));
}

/// **VALUE**: An unreadable preference file reports the caller's location.
///
/// **BUG THIS CATCHES**: Without `#[track_caller]` on `load` the location
/// always points inside the prefs module, whoever called it.
#[test]
fn given_unreadable_prefs_when_loaded_then_read_error_points_at_caller() {
    // GIVEN: A directory where the preference file should be
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(PREFS_FILE_NAME)).unwrap();

    // WHEN: Loading
    let err = PreferenceStore::load(dir.path()).unwrap_err();

    // THEN: A read error located in this test file
    assert!(matches!(err, PrefsError::Read { .. }));
    let error_string = err.to_string();
    assert!(error_string.contains("Preferences Read Error"));
    assert!(error_string.contains("integration_tests"), "{error_string}");
}
