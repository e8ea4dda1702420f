// Tests error serialization (critical for Tauri IPC)

use crate::error::DiogenesError;

use serde_json::Value;

/// **VALUE**: Tests that errors can be serialized (required for Tauri IPC).
///
/// **WHY THIS MATTERS**: Bridge failures travel to the page as JSON. If
/// serialization breaks, the page receives an opaque failure.
///
/// **BUG THIS CATCHES**: Would catch removing `#[derive(Serialize)]` or adding
/// a non-serializable field.
#[test]
fn given_bridge_error_when_serialized_then_tagged_with_type_and_data() {
    // GIVEN: A bridge error
    let err = DiogenesError::bridge("Server Not Ready Error");

    // WHEN: Serializing to JSON
    let json: Value = serde_json::to_value(&err).unwrap();

    // THEN: Adjacently tagged with the message and a location
    assert_eq!(json["type"], "Bridge");
    assert_eq!(json["data"]["message"], "Server Not Ready Error");
    assert!(json["data"]["location"]["line"].as_u64().unwrap() > 0);
}

/// **VALUE**: The helper constructors record the caller, not `error.rs`.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[track_caller]` on a helper,
/// which would make every error point at the same line.
#[test]
fn given_helper_constructor_when_formatted_then_location_is_call_site() {
    // GIVEN/WHEN: A window error created here
    let err = DiogenesError::window("no such window");

    // THEN: Location is this test file
    let DiogenesError::Window { location, .. } = &err else {
        panic!("expected Window variant, got {err:?}");
    };
    assert!(location.file.ends_with("tests/error.rs"), "{}", location.file);
    assert!(err.to_string().starts_with("Window Error: no such window"));
}
