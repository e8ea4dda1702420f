use client_core::PREFS_FILE_NAME;
use client_core::error::prefs::PrefsError;
use client_core::prefs::{
    self, DatabaseKind, FontPreference, PREFS_HEADER, PreferenceStore, location_looks_valid,
    marker_exists,
};

use std::fs;
use std::path::Path;

use tempfile::TempDir;

fn write_prefs(dir: &Path, contents: &str) {
    fs::write(dir.join(PREFS_FILE_NAME), contents).unwrap();
}

fn read_prefs(dir: &Path) -> String {
    fs::read_to_string(dir.join(PREFS_FILE_NAME)).unwrap()
}

// ----------------------------------------------------------------------------
// PreferenceStore
// ----------------------------------------------------------------------------

/// **VALUE**: Rewriting a key replaces its line in place; nothing is duplicated.
///
/// **WHY THIS MATTERS**: The server reads the first matching line. An appended
/// duplicate would leave the old location in effect.
#[test]
fn given_existing_phi_line_when_set_path_then_replaced_without_duplicate() {
    // GIVEN: A preference file with a PHI location
    let dir = TempDir::new().unwrap();
    write_prefs(dir.path(), "phi_dir \"/a/b\"\n");

    // WHEN: Pointing PHI elsewhere
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    store.set_path(DatabaseKind::Phi, "/c/d").unwrap();

    // THEN: Exactly one phi_dir line holding the new value
    let contents = read_prefs(dir.path());
    let phi_lines: Vec<&str> = contents.lines().filter(|l| l.starts_with("phi_dir")).collect();
    assert_eq!(phi_lines, vec!["phi_dir \"/c/d\""]);
}

/// **VALUE**: Unrelated lines survive a write verbatim and in their original order.
///
/// **WHY THIS MATTERS**: The server stores its own settings in the same file.
///
/// **BUG THIS CATCHES**: Would catch rewriting the file from a map, which
/// reorders keys and drops comments.
#[test]
fn given_mixed_prefs_when_set_path_then_other_lines_preserved_in_order() {
    // GIVEN: Comments, server settings and two database lines
    let dir = TempDir::new().unwrap();
    let original = "# Created by Diogenes\n\
                    context \"sentence\"\n\
                    tlg_dir \"/corpora/tlg\"\n\
                    # my PHI disc\n\
                    phi_dir \"/old/phi\"\n\
                    cgi_default_encoding \"UTF-8\"\n";
    write_prefs(dir.path(), original);

    // WHEN: Rewriting the PHI location
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    store.set_path(DatabaseKind::Phi, "/new/phi").unwrap();

    // THEN: Only the phi_dir line changed
    let expected = original.replace("phi_dir \"/old/phi\"", "phi_dir \"/new/phi\"");
    assert_eq!(read_prefs(dir.path()), expected);
}

/// **VALUE**: Write then read yields exactly the written value, once.
#[test]
fn given_each_database_when_set_then_get_path_round_trips() {
    // GIVEN: An empty settings directory
    let dir = TempDir::new().unwrap();

    // WHEN: Setting every database location, TLG twice
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    for kind in DatabaseKind::ALL {
        store.set_path(kind, &format!("/corpora/{}", kind.key())).unwrap();
    }
    store.set_path(DatabaseKind::Tlg, "/elsewhere/tlg").unwrap();

    // THEN: A fresh load sees each value, and one line per key
    let reloaded = PreferenceStore::load(dir.path()).unwrap();
    for kind in DatabaseKind::ALL {
        let expected = match kind {
            DatabaseKind::Tlg => String::from("/elsewhere/tlg"),
            other => format!("/corpora/{}", other.key()),
        };
        assert_eq!(reloaded.get_path(kind), Some(expected));

        let prefix = format!("{}_dir", kind.key());
        let count = read_prefs(dir.path())
            .lines()
            .filter(|l| l.split_whitespace().next() == Some(prefix.as_str()))
            .count();
        assert_eq!(count, 1, "{kind} should have exactly one line");
    }
}

/// **VALUE**: A duplicated key left by hand-editing collapses to one line.
#[test]
fn given_duplicate_key_lines_when_set_path_then_one_line_remains() {
    // GIVEN: Two tlg_dir lines around a comment
    let dir = TempDir::new().unwrap();
    write_prefs(dir.path(), "tlg_dir \"/one\"\n# keep me\ntlg_dir \"/two\"\n");

    // WHEN: Setting TLG
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    store.set_path(DatabaseKind::Tlg, "/three").unwrap();

    // THEN: The first line is replaced, the duplicate dropped, the comment kept
    assert_eq!(read_prefs(dir.path()), "tlg_dir \"/three\"\n# keep me\n");
}

/// **VALUE**: A key that merely shares a prefix is not touched.
///
/// **BUG THIS CATCHES**: An unanchored `^phi_dir` match would overwrite
/// `phi_dir_old` when the PHI location changes.
#[test]
fn given_prefixed_key_when_set_path_then_only_exact_key_replaced() {
    // GIVEN: A line whose key extends phi_dir
    let dir = TempDir::new().unwrap();
    write_prefs(dir.path(), "phi_dir_old \"/legacy\"\n");

    // WHEN: Setting PHI
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    store.set_path(DatabaseKind::Phi, "/current").unwrap();

    // THEN: The old line is untouched and a new one appended
    assert_eq!(
        read_prefs(dir.path()),
        "phi_dir_old \"/legacy\"\nphi_dir \"/current\"\n"
    );
}

/// **VALUE**: First write creates the file with its header.
#[test]
fn given_no_prefs_file_when_set_path_then_file_created_with_header() {
    // GIVEN: A settings directory that doesn't exist yet
    let root = TempDir::new().unwrap();
    let dir = root.path().join("diogenes");

    // WHEN: Setting a location
    let mut store = PreferenceStore::load(&dir).unwrap();
    assert!(!store.exists());
    store.set_path(DatabaseKind::Ddp, "/corpora/ddp").unwrap();

    // THEN: Header first, then the entry
    assert!(store.exists());
    assert_eq!(
        read_prefs(&dir),
        format!("{PREFS_HEADER}\nddp_dir \"/corpora/ddp\"")
    );
}

/// **VALUE**: Values are read with or without quotes, and paths may contain spaces.
#[test]
fn given_quoted_and_unquoted_values_when_get_path_then_both_read() {
    // GIVEN: One quoted and one bare entry
    let dir = TempDir::new().unwrap();
    write_prefs(
        dir.path(),
        "phi_dir \"/Volumes/PHI 5.3\"\ntlg_dir /corpora/tlg\n",
    );

    // WHEN: Reading them
    let store = PreferenceStore::load(dir.path()).unwrap();

    // THEN: Quotes are stripped, spaces kept
    assert_eq!(
        store.get_path(DatabaseKind::Phi),
        Some(String::from("/Volumes/PHI 5.3"))
    );
    assert_eq!(
        store.get_path(DatabaseKind::Tlg),
        Some(String::from("/corpora/tlg"))
    );
    assert_eq!(store.get_path(DatabaseKind::Ddp), None);
}

/// **VALUE**: A location that would break out of its quoted value is refused.
///
/// **WHY THIS MATTERS**: Pages send locations through the bridge. A quote
/// followed by a line break would plant a second line for another key.
///
/// **BUG THIS CATCHES**: Would catch formatting the value into the line
/// unchecked, which leaves two `tlg_dir` lines in the file.
#[test]
fn given_location_with_line_break_when_set_path_then_invalid_location_and_file_unchanged() {
    // GIVEN: A preference file with one TLG line
    let dir = TempDir::new().unwrap();
    let original = "tlg_dir \"/x\"\n";
    write_prefs(dir.path(), original);
    let mut store = PreferenceStore::load(dir.path()).unwrap();

    // WHEN: Setting PHI to values that smuggle in quotes or line breaks
    for location in ["/a\"\ntlg_dir \"/evil", "/a\rtlg_dir /evil", "/a\"b"] {
        let result = store.set_path(DatabaseKind::Phi, location);

        // THEN: Rejected, with nothing written
        assert!(
            matches!(result, Err(PrefsError::InvalidLocation { .. })),
            "{location:?}"
        );
    }
    assert_eq!(read_prefs(dir.path()), original);
    assert_eq!(store.get_path(DatabaseKind::Phi), None);
    assert_eq!(store.get_path(DatabaseKind::Tlg), Some(String::from("/x")));
}

/// **VALUE**: A file written with CRLF line endings keeps them after a write.
///
/// **BUG THIS CATCHES**: Would catch splitting on lines and joining with
/// `\n`, which rewrites every unrelated line of a Windows-edited file.
#[test]
fn given_crlf_prefs_when_set_path_then_line_endings_preserved() {
    // GIVEN: A CRLF preference file
    let dir = TempDir::new().unwrap();
    write_prefs(
        dir.path(),
        "# my settings\r\ncontext \"sentence\"\r\nphi_dir \"/old\"\r\n",
    );

    // WHEN: Rewriting PHI and adding TLG
    let mut store = PreferenceStore::load(dir.path()).unwrap();
    store.set_path(DatabaseKind::Phi, "/new").unwrap();
    store.set_path(DatabaseKind::Tlg, "/tlg").unwrap();

    // THEN: Every line, old or new, ends in CRLF
    assert_eq!(
        read_prefs(dir.path()),
        "# my settings\r\ncontext \"sentence\"\r\nphi_dir \"/new\"\r\ntlg_dir \"/tlg\"\r\n"
    );
}

// ----------------------------------------------------------------------------
// "Database configured" predicate
// ----------------------------------------------------------------------------

/// **VALUE**: No preference file means first-run setup.
#[test]
fn given_no_prefs_file_when_is_database_configured_then_false() {
    // GIVEN: An empty settings directory
    let dir = TempDir::new().unwrap();

    // WHEN/THEN: Not configured
    assert!(!prefs::is_database_configured(dir.path()));
}

/// **VALUE**: Any `<key>_dir <value>` line counts; a header alone does not.
#[test]
fn given_prefs_contents_when_is_database_configured_then_matches_dir_lines() {
    let cases = [
        ("# Created by Diogenes", false),
        ("# Created by Diogenes\n# phi_dir \"/commented/out\"\n", false),
        ("context \"sentence\"\n", false),
        ("phi_dir\n", false),
        ("tlg_dir \"/corpora/tlg\"\n", true),
        ("# header\nold_pdf_dir \"/pdf/old.pdf\"", true),
    ];

    for (contents, expected) in cases {
        // GIVEN: A preference file with these contents
        let dir = TempDir::new().unwrap();
        write_prefs(dir.path(), contents);

        // WHEN/THEN: The predicate matches expectation
        assert_eq!(
            prefs::is_database_configured(dir.path()),
            expected,
            "{contents:?}"
        );
    }
}

// ----------------------------------------------------------------------------
// DatabaseKind and the marker check
// ----------------------------------------------------------------------------

/// **VALUE**: Database names from pages parse regardless of case.
#[test]
fn given_database_names_when_parsed_then_kinds_returned() {
    assert_eq!("PHI".parse::<DatabaseKind>().unwrap(), DatabaseKind::Phi);
    assert_eq!("tll_pdf".parse::<DatabaseKind>().unwrap(), DatabaseKind::TllPdf);
    assert_eq!(" Old_Pdf ".parse::<DatabaseKind>().unwrap(), DatabaseKind::OldPdf);
    assert!(matches!(
        "LSJ".parse::<DatabaseKind>(),
        Err(PrefsError::UnknownDatabase { .. })
    ));
}

/// **VALUE**: The marker check is advisory and only applies to text databases.
///
/// **WHY THIS MATTERS**: PDF collections never contain `authtab.dir`; flagging
/// them would show a warning on every correct setup.
#[test]
fn given_locations_when_checked_then_marker_required_only_for_text_databases() {
    // GIVEN: A directory with the upper-case marker and one without
    let with_marker = TempDir::new().unwrap();
    fs::write(with_marker.path().join("AUTHTAB.DIR"), "").unwrap();
    let without_marker = TempDir::new().unwrap();

    // WHEN/THEN: Marker detection
    assert!(marker_exists(with_marker.path()));
    assert!(!marker_exists(without_marker.path()));

    // THEN: Only PHI/TLG/DDP need it
    assert!(location_looks_valid(DatabaseKind::Tlg, with_marker.path()));
    assert!(!location_looks_valid(DatabaseKind::Tlg, without_marker.path()));
    assert!(location_looks_valid(DatabaseKind::TllPdf, without_marker.path()));
    assert!(location_looks_valid(DatabaseKind::OldPdf, without_marker.path()));
    assert!(DatabaseKind::OldPdf.picks_file());
    assert!(!DatabaseKind::Phi.picks_file());
}

// ----------------------------------------------------------------------------
// Font preference
// ----------------------------------------------------------------------------

/// **VALUE**: A written font is read back and the stylesheet is valid CSS.
#[test]
fn given_font_when_written_then_read_back_from_stylesheet() {
    // GIVEN: A settings directory
    let dir = TempDir::new().unwrap();
    let font = FontPreference::new(dir.path());
    assert_eq!(font.read().unwrap(), None);

    // WHEN: Writing a font family
    font.write("Gentium Plus").unwrap();

    // THEN: It reads back and the CSS targets body
    assert_eq!(font.read().unwrap(), Some(String::from("Gentium Plus")));
    let css = fs::read_to_string(font.path()).unwrap();
    assert!(css.starts_with("body {"));
    assert!(css.contains("font-family: \"Gentium Plus\";"));
}

/// **VALUE**: Font names that would break out of the CSS rule are rejected.
///
/// **BUG THIS CATCHES**: A name like `x"; } * { display:none` would
/// otherwise be injected into every page the server renders.
#[test]
fn given_unsafe_font_name_when_written_then_invalid_font_error() {
    // GIVEN: A settings directory
    let dir = TempDir::new().unwrap();
    let font = FontPreference::new(dir.path());

    // WHEN/THEN: Each unsafe name is refused and nothing is written
    for name in ["", "   ", "x\"; } * { display:none", "Arial;", "Arial\n}"] {
        assert!(
            matches!(font.write(name), Err(PrefsError::InvalidFont { .. })),
            "{name:?}"
        );
    }
    assert!(!font.path().exists());
}

/// **VALUE**: Reverting removes the override, and reverting again is harmless.
#[test]
fn given_font_override_when_reverted_twice_then_both_succeed() {
    // GIVEN: A font override
    let dir = TempDir::new().unwrap();
    let font = FontPreference::new(dir.path());
    font.write("Cardo").unwrap();

    // WHEN: Reverting twice
    font.revert().unwrap();
    font.revert().unwrap();

    // THEN: No override remains
    assert_eq!(font.read().unwrap(), None);
}
