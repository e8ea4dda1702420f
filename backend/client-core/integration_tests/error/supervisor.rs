use client_core::error::CoreError;
use client_core::error::supervisor::SupervisorError;
use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;
use std::path::PathBuf;

/// **VALUE**: Verifies that `SupervisorError::Spawn` includes file/line/column location tracking.
///
/// **WHY THIS MATTERS**: A server that won't start is the most common support
/// report. The log line must say where the spawn was attempted.
///
/// **BUG THIS CATCHES**: Would catch if someone:
/// - Removes the `location` field from SupervisorError
/// - Breaks the Display implementation to not include location
#[test]
#[track_caller]
fn given_spawn_error_when_formatted_then_includes_location() {
    // GIVEN: A Spawn error with location
    let io_err = IoError::new(ErrorKind::PermissionDenied, "permission denied");
    let err = SupervisorError::Spawn {
        message: "Failed to spawn perl".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(io_err),
    };

    // WHEN: Formatting the error as string
    let error_string = format!("{}", err);

    // THEN: Should include error type, message, and file location
    assert!(error_string.contains("Spawn Error"));
    assert!(error_string.contains("Failed to spawn perl"));
    assert!(error_string.contains("supervisor.rs"));
}

/// **VALUE**: Verifies that the spawn failure keeps its OS error as the source.
///
/// **BUG THIS CATCHES**: Would catch a dropped `#[source]` attribute, which
/// hides "permission denied" behind a generic message.
#[test]
fn given_spawn_error_with_source_when_inspected_then_preserves_chain() {
    // GIVEN: A Spawn error wrapping an IO error
    let io_err = IoError::new(ErrorKind::PermissionDenied, "access denied");
    let err = SupervisorError::Spawn {
        message: "Failed to spawn perl".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(io_err),
    };

    // WHEN: Accessing the error source
    let source = err.source();

    // THEN: Underlying message survives
    assert!(source.is_some(), "Should have error source");
    assert!(format!("{}", source.unwrap()).contains("access denied"));
}

/// **VALUE**: Wrapping in `CoreError` keeps the message and location visible.
///
/// **BUG THIS CATCHES**: Would catch `CoreError` losing `#[error(transparent)]`
/// and printing only its own variant name in the startup dialog.
#[test]
#[track_caller]
fn given_launcher_not_found_when_wrapped_in_core_error_then_display_transparent() {
    // GIVEN: A launcher error converted with `?`-style From
    let err: CoreError = SupervisorError::LauncherNotFound {
        message: "perl not found".to_string(),
        searched: vec![PathBuf::from("/opt/strawberry/perl/bin/perl.exe")],
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: Same text as the inner error
    assert!(error_string.contains("Launcher Not Found Error"));
    assert!(error_string.contains("perl not found"));
    assert!(error_string.contains("supervisor.rs"));
}
