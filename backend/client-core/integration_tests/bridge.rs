use client_core::bridge::{
    Bridge, BridgeError, BridgeRequest, BridgeResponse, DatabaseLocation, LocationPicker, NoPicker,
};
use client_core::prefs::{DatabaseKind, PreferenceStore};
use client_core::{FONT_CSS_FILE_NAME, PREFS_FILE_NAME};

use crate::helpers::first_run_url;

use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;
use url::Url;

/// Picker that always answers with the same location.
struct FixedPicker(PathBuf);

impl LocationPicker for FixedPicker {
    fn pick(&self, _db: DatabaseKind) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// **VALUE**: Pages can't learn a port before the handshake completes.
///
/// **BUG THIS CATCHES**: Would catch answering `0` or a stale port while the
/// server is still starting.
#[test]
fn given_no_port_when_get_port_then_not_ready() {
    // GIVEN: A bridge before Ready
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), None, &first_run, &NoPicker);

    // WHEN: Asking for the port and the landing page
    let port = bridge.handle(BridgeRequest::GetPort);
    let landing = bridge.handle(BridgeRequest::Landing);

    // THEN: Both refuse
    assert!(matches!(port, Err(BridgeError::NotReady { .. })), "{port:?}");
    assert!(matches!(landing, Err(BridgeError::NotReady { .. })), "{landing:?}");
}

/// **VALUE**: Once ready the port and settings directory are reported.
#[test]
fn given_ready_bridge_when_get_port_and_dir_then_answered() {
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), Some(8080), &first_run, &NoPicker);

    assert_eq!(
        bridge.handle(BridgeRequest::GetPort).unwrap(),
        BridgeResponse::Port(8080)
    );
    assert_eq!(
        bridge.handle(BridgeRequest::GetSettingsDir).unwrap(),
        BridgeResponse::SettingsDir(dir.path().to_path_buf())
    );
}

/// **VALUE**: Storing a location writes the prefs file and flips the landing page.
///
/// **WHY THIS MATTERS**: This is how first-run setup completes: the next
/// window lands on the server instead of the setup page again.
#[test]
fn given_first_run_when_set_database_path_then_landing_becomes_home() {
    // GIVEN: No prefs, a PHI directory with its marker
    let dir = TempDir::new().unwrap();
    let corpus = TempDir::new().unwrap();
    fs::write(corpus.path().join("authtab.dir"), b"").unwrap();
    let corpus_path = corpus.path().to_string_lossy().to_string();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), Some(8080), &first_run, &NoPicker);
    assert_eq!(
        bridge.handle(BridgeRequest::Landing).unwrap(),
        BridgeResponse::Landing(first_run.clone())
    );

    // WHEN: Setting the PHI location
    let response = bridge
        .handle(BridgeRequest::SetDatabasePath {
            db: DatabaseKind::Phi,
            path: corpus_path.clone(),
        })
        .unwrap();

    // THEN: Stored, validated, and the landing page is now the server
    assert_eq!(
        response,
        BridgeResponse::Location(Some(DatabaseLocation {
            db: DatabaseKind::Phi,
            path: Some(corpus_path.clone()),
            looks_valid: true,
        }))
    );
    let store = PreferenceStore::load(dir.path()).unwrap();
    assert_eq!(store.get_path(DatabaseKind::Phi), Some(corpus_path));
    assert_eq!(
        bridge.handle(BridgeRequest::Landing).unwrap(),
        BridgeResponse::Landing(Url::parse("http://localhost:8080/").unwrap())
    );
}

/// **VALUE**: A location without its marker is stored but flagged.
#[test]
fn given_directory_without_marker_when_set_then_stored_but_not_valid() {
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), None, &first_run, &NoPicker);

    let response = bridge
        .handle(BridgeRequest::SetDatabasePath {
            db: DatabaseKind::Tlg,
            path: "/nowhere/tlg".to_string(),
        })
        .unwrap();

    let BridgeResponse::Location(Some(location)) = response else {
        panic!("expected a location, got {response:?}");
    };
    assert!(!location.looks_valid);
    assert!(dir.path().join(PREFS_FILE_NAME).exists());
}

/// **VALUE**: The picker's choice is stored; cancelling changes nothing.
#[test]
fn given_picker_when_pick_database_then_stored_or_cancelled() {
    // GIVEN: A picker choosing a PDF file, and one that cancels
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let picker = FixedPicker(PathBuf::from("/pdfs/old.pdf"));
    let picking = Bridge::new(dir.path(), None, &first_run, &picker);
    let cancelling = Bridge::new(dir.path(), None, &first_run, &NoPicker);

    // WHEN: Cancelling first
    let cancelled = cancelling
        .handle(BridgeRequest::PickDatabase {
            db: DatabaseKind::OldPdf,
        })
        .unwrap();

    // THEN: Nothing written
    assert_eq!(cancelled, BridgeResponse::Location(None));
    assert!(!dir.path().join(PREFS_FILE_NAME).exists());

    // WHEN: Picking
    let picked = picking
        .handle(BridgeRequest::PickDatabase {
            db: DatabaseKind::OldPdf,
        })
        .unwrap();

    // THEN: PDF kinds need no marker
    assert_eq!(
        picked,
        BridgeResponse::Location(Some(DatabaseLocation {
            db: DatabaseKind::OldPdf,
            path: Some("/pdfs/old.pdf".to_string()),
            looks_valid: true,
        }))
    );
}

/// **VALUE**: Reading preferences creates the settings directory and lists every database.
#[test]
fn given_missing_settings_dir_when_read_preferences_then_created_and_empty() {
    // GIVEN: A settings directory that doesn't exist yet
    let parent = TempDir::new().unwrap();
    let settings = parent.path().join("Diogenes");
    let first_run = first_run_url();
    let bridge = Bridge::new(&settings, None, &first_run, &NoPicker);

    // WHEN: Reading
    let response = bridge.handle(BridgeRequest::ReadPreferences).unwrap();

    // THEN: Directory exists; nothing configured
    assert!(settings.is_dir());
    let BridgeResponse::Preferences {
        contents,
        configured,
        locations,
    } = response
    else {
        panic!("expected preferences, got {response:?}");
    };
    assert_eq!(contents, None);
    assert!(!configured);
    assert_eq!(locations.len(), DatabaseKind::ALL.len());
    assert!(locations.iter().all(|l| l.path.is_none()));
}

/// **VALUE**: Font write, read and revert go through `config.css`.
#[test]
fn given_font_requests_when_handled_then_stylesheet_follows() {
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), None, &first_run, &NoPicker);

    // WHEN: Writing a font
    let written = bridge
        .handle(BridgeRequest::WriteFont {
            font: "GFS Didot".to_string(),
        })
        .unwrap();

    // THEN: Read back
    assert_eq!(written, BridgeResponse::Done);
    assert_eq!(
        bridge.handle(BridgeRequest::ReadFont).unwrap(),
        BridgeResponse::Font(Some("GFS Didot".to_string()))
    );

    // WHEN: Reverting
    bridge.handle(BridgeRequest::RevertFont).unwrap();

    // THEN: Gone
    assert!(!dir.path().join(FONT_CSS_FILE_NAME).exists());
    assert_eq!(
        bridge.handle(BridgeRequest::ReadFont).unwrap(),
        BridgeResponse::Font(None)
    );
}

/// **VALUE**: A font that would break the stylesheet is rejected.
#[test]
fn given_injecting_font_when_write_font_then_prefs_error() {
    let dir = TempDir::new().unwrap();
    let first_run = first_run_url();
    let bridge = Bridge::new(dir.path(), None, &first_run, &NoPicker);

    let result = bridge.handle(BridgeRequest::WriteFont {
        font: "Arial; } body { display: none".to_string(),
    });

    assert!(matches!(result, Err(BridgeError::Prefs(_))), "{result:?}");
    assert!(!dir.path().join(FONT_CSS_FILE_NAME).exists());
}

/// **VALUE**: The wire shape pages rely on stays stable.
///
/// **BUG THIS CATCHES**: Would catch a serde attribute change that silently
/// breaks every page script.
#[test]
fn given_requests_and_responses_when_serialized_then_tagged_json() {
    // GIVEN: A request as a page sends it
    let wire = json!({"op": "setDatabasePath", "args": {"db": "TLL_PDF", "path": "/tll"}});

    // WHEN: Parsing
    let request: BridgeRequest = serde_json::from_value(wire).unwrap();

    // THEN: Typed request
    assert_eq!(
        request,
        BridgeRequest::SetDatabasePath {
            db: DatabaseKind::TllPdf,
            path: "/tll".to_string(),
        }
    );
    assert_eq!(request.name(), "setDatabasePath");

    let get_port: BridgeRequest = serde_json::from_value(json!({"op": "getPort"})).unwrap();
    assert_eq!(get_port, BridgeRequest::GetPort);

    // THEN: Responses are tagged by type
    assert_eq!(
        serde_json::to_value(BridgeResponse::Port(8080)).unwrap(),
        json!({"type": "port", "data": 8080})
    );
    assert_eq!(
        serde_json::to_value(BridgeResponse::Done).unwrap(),
        json!({"type": "done"})
    );
    assert_eq!(
        serde_json::to_value(BridgeResponse::Location(Some(DatabaseLocation {
            db: DatabaseKind::Phi,
            path: None,
            looks_valid: false,
        })))
        .unwrap(),
        json!({"type": "location", "data": {"db": "PHI", "path": null, "looksValid": false}})
    );
}
