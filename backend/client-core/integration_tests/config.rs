use client_core::SHELL_CONFIG_FILE_NAME;
use client_core::config::ShellConfig;
use client_core::error::config::ConfigError;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

/// **VALUE**: No `shell.json` means a 30 second handshake timeout and no overrides.
#[test]
fn given_no_config_file_when_loaded_then_defaults() {
    // GIVEN: An empty settings directory
    let dir = TempDir::new().unwrap();

    // WHEN: Loading
    let config = ShellConfig::load(dir.path()).unwrap();

    // THEN: Defaults
    assert_eq!(config, ShellConfig::default());
    assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(30)));
    assert!(config.launcher.is_none());
}

/// **VALUE**: A saved config loads back identically and leaves no temp file.
#[test]
fn given_config_when_saved_then_round_trips_atomically() {
    // GIVEN: A config with overrides
    let dir = TempDir::new().unwrap();
    let config = ShellConfig {
        handshake_timeout_secs: 90,
        launcher: Some(PathBuf::from("/usr/local/bin/perl")),
        ..ShellConfig::default()
    };

    // WHEN: Saving then loading
    config.save(dir.path()).unwrap();
    let loaded = ShellConfig::load(dir.path()).unwrap();

    // THEN: Identical, and only the final file remains
    assert_eq!(loaded, config);
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec![SHELL_CONFIG_FILE_NAME.to_string()]);
}

/// **VALUE**: A timeout of zero disables the handshake deadline.
#[test]
fn given_zero_timeout_when_handshake_timeout_called_then_none() {
    // GIVEN: Timeout disabled
    let config = ShellConfig {
        handshake_timeout_secs: 0,
        ..ShellConfig::default()
    };

    // WHEN/THEN: No deadline
    assert_eq!(config.handshake_timeout(), None);
}

/// **VALUE**: Out-of-range values are rejected before they take effect.
///
/// **BUG THIS CATCHES**: A relative launcher path would resolve against
/// whatever directory the OS started us in.
#[test]
fn given_invalid_values_when_validated_then_validation_error() {
    let invalid = [
        ShellConfig {
            version: 0,
            ..ShellConfig::default()
        },
        ShellConfig {
            handshake_timeout_secs: 601,
            ..ShellConfig::default()
        },
        ShellConfig {
            launcher: Some(PathBuf::from("perl")),
            ..ShellConfig::default()
        },
        ShellConfig {
            server_script: Some(PathBuf::from("server/diogenes-server.pl")),
            ..ShellConfig::default()
        },
    ];

    for config in invalid {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{config:?}"
        );
    }
}

/// **VALUE**: A corrupt file is an error from `load` but defaults from `load_or_default`.
///
/// **WHY THIS MATTERS**: A hand-edited typo in an optional tuning file must not
/// stop the application from starting.
#[test]
fn given_corrupt_config_when_loaded_then_error_or_defaults() {
    // GIVEN: Malformed JSON
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(SHELL_CONFIG_FILE_NAME), "{ handshake_timeout_secs: }").unwrap();

    // WHEN: Loading both ways
    let strict = ShellConfig::load(dir.path());
    let lenient = ShellConfig::load_or_default(dir.path());

    // THEN: Strict reports a parse error, lenient yields defaults
    assert!(matches!(strict, Err(ConfigError::ParseError { .. })));
    assert_eq!(lenient, ShellConfig::default());
}

/// **VALUE**: Missing fields take their defaults.
#[test]
fn given_partial_config_when_loaded_then_missing_fields_default() {
    // GIVEN: Only a timeout
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(SHELL_CONFIG_FILE_NAME),
        r#"{"handshake_timeout_secs": 5}"#,
    )
    .unwrap();

    // WHEN: Loading
    let config = ShellConfig::load(dir.path()).unwrap();

    // THEN: Timeout set, the rest default
    assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.version, 1);
    assert!(config.server_script.is_none());
}
