use diogenes::commands::window::Destination;
use diogenes::window::{first_run_url, placement};

use client_core::session::{NavTarget, is_allowed_navigation};
use client_core::window_state::{self, Bounds, Geometry, Placement, WindowState};

use serde_json::json;

/// **VALUE**: The bundled first-run page passes the navigation guard.
///
/// **WHY THIS MATTERS**: If the guard refused the app's own origin, first-run
/// setup could never be shown and the shell could never be configured.
///
/// **BUG THIS CATCHES**: Would catch a platform-specific first-run URL that
/// `is_allowed_navigation` doesn't know about.
#[test]
fn given_first_run_url_when_checked_then_navigation_allowed() {
    // GIVEN: The platform's first-run URL
    let url = first_run_url().unwrap();

    // WHEN/THEN: It is a bundled page the guard accepts
    assert!(url.path().ends_with("/firstrun.html"), "{url}");
    assert!(is_allowed_navigation(&url), "{url}");
}

/// **VALUE**: Page destination names map to the navigation targets the menu used.
#[test]
fn given_destination_names_when_deserialized_then_map_to_nav_targets() {
    let cases = [
        ("home", NavTarget::Home),
        ("settings", NavTarget::Settings),
        ("databaseLocations", NavTarget::FirstRun),
        ("tllDownload", NavTarget::TllDownload),
    ];

    for (name, expected) in cases {
        let destination: Destination = serde_json::from_value(json!(name)).unwrap();
        assert_eq!(NavTarget::from(destination), expected, "{name}");
    }
}

/// **VALUE**: Asking for a reset opens at 0,0 with the default size, whatever
/// was saved and whichever window asked.
///
/// **WHY THIS MATTERS**: Saved bounds from a disconnected display put every
/// new window off-screen. The reset is the only way back.
///
/// **BUG THIS CATCHES**: Would catch the opener's offset taking priority over
/// the reset request.
#[test]
fn given_reset_request_when_placed_then_window_at_origin_with_default_size() {
    // GIVEN: Saved bounds far off-screen and an opener window
    let saved = WindowState::from_window(
        false,
        Bounds {
            x: 5000,
            y: 4000,
            width: 1400,
            height: 900,
        },
    );

    // WHEN: Placing a window with reset requested
    let chosen = placement(true, Some((5000, 4000)));

    // THEN: Reset geometry
    assert_eq!(chosen, Placement::Reset);
    assert_eq!(
        window_state::geometry(Some(&saved), chosen),
        Geometry {
            position: Some((0, 0)),
            width: 800,
            height: 600,
            maximized: false,
        }
    );
}

/// **VALUE**: Without a reset, an opener gives an offset and no opener restores.
#[test]
fn given_no_reset_when_placed_then_offset_or_restore() {
    assert_eq!(placement(false, Some((10, 20))), Placement::Offset { from: (10, 20) });
    assert_eq!(placement(false, None), Placement::Restore);
}
