use client_core::WINDOW_STATE_FILE_NAME;
use client_core::window_state::{
    self, Bounds, DEFAULT_HEIGHT, DEFAULT_WIDTH, Geometry, Placement, WindowState,
};

use std::fs;

use tempfile::TempDir;

fn bounds() -> Bounds {
    Bounds {
        x: 100,
        y: 50,
        width: 1024,
        height: 768,
    }
}

/// **VALUE**: A maximized window saves no bounds, matching the file format.
///
/// **WHY THIS MATTERS**: The file is shared with earlier shells, which expect
/// `bounds` only when not maximized.
#[test]
fn given_maximized_window_when_saved_then_file_has_no_bounds() {
    // GIVEN: A maximized window
    let dir = TempDir::new().unwrap();
    let state = WindowState::from_window(true, bounds());

    // WHEN: Saving
    state.save(dir.path()).unwrap();

    // THEN: Only `maximized` is written
    let json = fs::read_to_string(dir.path().join(WINDOW_STATE_FILE_NAME)).unwrap();
    assert_eq!(json, r#"{"maximized":true}"#);
}

/// **VALUE**: Saved bounds load back unchanged.
#[test]
fn given_saved_bounds_when_loaded_then_same_state() {
    // GIVEN: A saved, normal window
    let dir = TempDir::new().unwrap();
    let state = WindowState::from_window(false, bounds());
    state.save(dir.path()).unwrap();

    // WHEN: Loading
    let loaded = WindowState::load(dir.path());

    // THEN: Same state
    assert_eq!(loaded, Some(state));
}

/// **VALUE**: A file written by an older shell is understood.
#[test]
fn given_legacy_window_state_json_when_read_then_parsed() {
    // GIVEN: JSON in the historical layout
    let dir = TempDir::new().unwrap();
    let path = window_state::window_state_path(dir.path());
    fs::write(
        &path,
        r#"{"maximized":false,"bounds":{"x":10,"y":20,"width":900,"height":700}}"#,
    )
    .unwrap();

    // WHEN: Reading
    let state = WindowState::read(&path).unwrap().unwrap();

    // THEN: Bounds are populated
    assert!(!state.maximized);
    assert_eq!(
        state.bounds,
        Some(Bounds {
            x: 10,
            y: 20,
            width: 900,
            height: 700
        })
    );
}

/// **VALUE**: A corrupt window-state file falls back to defaults instead of failing.
///
/// **BUG THIS CATCHES**: Would catch window creation aborting because the
/// previous run crashed halfway through writing this file.
#[test]
fn given_corrupt_window_state_when_loaded_then_none_and_default_geometry() {
    // GIVEN: A truncated file
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(WINDOW_STATE_FILE_NAME), r#"{"maximized":fal"#).unwrap();

    // WHEN: Loading and computing geometry
    let loaded = WindowState::load(dir.path());
    let geometry = window_state::geometry(loaded.as_ref(), Placement::Restore);

    // THEN: Platform default position, default size
    assert_eq!(loaded, None);
    assert_eq!(
        geometry,
        Geometry {
            position: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            maximized: false
        }
    );
}

/// **VALUE**: First, additional and reset windows are placed differently.
///
/// **WHY THIS MATTERS**: New windows that open exactly on top of their parent
/// look like nothing happened.
#[test]
fn given_saved_state_when_geometry_computed_then_placement_rules_apply() {
    // GIVEN: A saved, normal window
    let saved = WindowState::from_window(false, bounds());

    // WHEN: Computing each placement
    let first = window_state::geometry(Some(&saved), Placement::Restore);
    let another = window_state::geometry(Some(&saved), Placement::Offset { from: (300, 200) });
    let reset = window_state::geometry(Some(&saved), Placement::Reset);

    // THEN: Restore uses saved bounds
    assert_eq!(first.position, Some((100, 50)));
    assert_eq!((first.width, first.height), (1024, 768));

    // THEN: Additional windows sit 20px down and right of their origin, saved size
    assert_eq!(another.position, Some((320, 220)));
    assert_eq!((another.width, another.height), (1024, 768));

    // THEN: Reset goes to the origin at the default size
    assert_eq!(reset.position, Some((0, 0)));
    assert_eq!((reset.width, reset.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
}

/// **VALUE**: Maximized state is re-applied, except on reset.
#[test]
fn given_maximized_state_when_geometry_computed_then_maximized_unless_reset() {
    // GIVEN: A saved maximized window
    let saved = WindowState::from_window(true, bounds());

    // WHEN/THEN: Restore maximizes at the default size, reset does not maximize
    let first = window_state::geometry(Some(&saved), Placement::Restore);
    assert!(first.maximized);
    assert_eq!(first.position, None);
    assert_eq!((first.width, first.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));

    let reset = window_state::geometry(Some(&saved), Placement::Reset);
    assert!(!reset.maximized);
}
