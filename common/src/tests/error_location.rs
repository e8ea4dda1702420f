use crate::{ErrorLocation, is_not_found};

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the call site, not itself.
///
/// **WHY THIS MATTERS**: Every supervisor and handshake error carries a location. If the
/// helper reported its own position, every error would point at `error_location.rs`.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` is dropped from `caller()`.
#[test]
fn given_track_caller_helper_when_location_captured_then_points_at_caller() {
    // GIVEN: A helper that builds a location the way error constructors do
    #[track_caller]
    fn raise() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing from two consecutive lines
    let first = raise();
    let second = raise();

    // THEN: Both point at this test file on consecutive lines
    assert!(first.file.ends_with("error_location.rs"));
    assert!(first.file.contains("tests"), "Should be the test file, got {}", first.file);
    assert_eq!(first.line + 1, second.line);
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` rendering used in error messages.
///
/// **WHY THIS MATTERS**: Log lines and the startup-failure dialog both embed this text.
///
/// **BUG THIS CATCHES**: Would catch format drift in the `Display` impl.
#[test]
fn given_location_when_displayed_then_renders_bracketed_triple() {
    // GIVEN: A location captured here
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting it
    let rendered = location.to_string();

    // THEN: Should be "[file:line:column]"
    assert_eq!(
        rendered,
        format!("[{}:{}:{}]", location.file, location.line, location.column)
    );
}

/// **VALUE**: Verifies locations serialize, since app errors cross the IPC bridge.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[derive(Serialize)]`.
#[test]
fn given_location_when_serialized_then_has_file_line_column_fields() {
    // GIVEN: A location
    let location = ErrorLocation::caller();

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(location).unwrap();

    // THEN: All three fields are present
    assert!(json["file"].is_string());
    assert!(json["line"].is_u64());
    assert!(json["column"].is_u64());
}

#[test]
fn given_io_errors_when_classified_then_only_not_found_is_ignorable() {
    assert!(is_not_found(&IoError::new(ErrorKind::NotFound, "gone")));
    assert!(!is_not_found(&IoError::new(ErrorKind::PermissionDenied, "nope")));
}
