// Unit tests for supervisor module private functions
// Integration tests for the public API are in integration_tests/supervisor.rs

use crate::CONFIG_DIR_ENV;
use crate::config::ShellConfig;
use crate::supervisor::build_spawn_command;
use crate::supervisor::launcher::{Launch, LauncherSearch, Platform, SERVER_SCRIPT};
use crate::supervisor::process::{format_command, is_protected_pid, with_process};

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// **VALUE**: The pids stale cleanup must never touch are refused up front.
///
/// **WHY THIS MATTERS**: Lock files are written by another program and may be
/// garbage. Signalling pid 0 hits our process group and pid 1 is init.
///
/// **BUG THIS CATCHES**: Would catch a guard that only checks `pid == 0`, or
/// one that forgets the shell's own pid.
#[test]
fn given_reserved_pids_when_is_protected_pid_called_then_returns_true() {
    // GIVEN: pid 0, pid 1 and our own pid
    let own = std::process::id();

    // WHEN/THEN: All are protected
    assert!(is_protected_pid(0));
    assert!(is_protected_pid(1));
    assert!(is_protected_pid(own));

    // THEN: An ordinary pid is not
    assert!(!is_protected_pid(4242));
}

/// **VALUE**: `with_process()` returns None for pids that don't exist.
///
/// **BUG THIS CATCHES**: A stale pid from a previous boot would otherwise be
/// reported as running and cleanup would wait on a ghost.
#[test]
fn given_nonexistent_pid_when_with_process_called_then_returns_none() {
    // GIVEN: A PID that doesn't exist
    let fake_pid = u32::MAX;

    // WHEN: Calling with_process with the invalid PID
    let result = with_process(fake_pid, |_| true);

    // THEN: Should return None
    assert!(result.is_none(), "Should return None for non-existent process");
}

/// **VALUE**: `format_command()` renders our own command line.
///
/// **WHY THIS MATTERS**: The stale-kill check compares the launcher name against
/// the command line; an empty rendering would refuse every kill.
#[test]
fn given_own_pid_when_format_command_called_then_returns_command_string() {
    // GIVEN: Our own PID
    let our_pid = std::process::id();

    // WHEN: Formatting its command line
    let result = with_process(our_pid, format_command);

    // THEN: Should return a non-empty string
    let cmd = result.expect("Should find our own process");
    assert!(!cmd.is_empty(), "Command string should not be empty");
}

/// **VALUE**: The spawned server learns where the settings directory is.
///
/// **WHY THIS MATTERS**: The server writes its lock file into the directory
/// named by `Diogenes_Config_Dir`. Without it the lock file lands elsewhere and
/// the handshake never completes.
///
/// **BUG THIS CATCHES**: Would catch the env var being renamed, dropped, or the
/// entry point not being passed as the single argument.
#[test]
fn given_launch_when_build_spawn_command_called_then_sets_program_arg_and_env() {
    // GIVEN: A resolved launch and a settings directory
    let launch = Launch {
        program: PathBuf::from("/usr/bin/perl"),
        entry_point: PathBuf::from("/opt/diogenes/server/diogenes-server.pl"),
    };
    let settings_dir = Path::new("/home/reader/.config/diogenes");

    // WHEN: Building the command
    let cmd = build_spawn_command(&launch, settings_dir);
    let std_cmd = cmd.as_std();

    // THEN: Program, single argument and env var are set
    assert_eq!(std_cmd.get_program(), OsStr::new("/usr/bin/perl"));
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, vec![launch.entry_point.as_os_str()]);

    let env = std_cmd
        .get_envs()
        .find(|(key, _)| *key == OsStr::new(CONFIG_DIR_ENV))
        .and_then(|(_, value)| value);
    assert_eq!(env, Some(settings_dir.as_os_str()));
}

/// **VALUE**: Windows looks for the bundled Strawberry Perl two levels up first.
///
/// **WHY THIS MATTERS**: Installed builds keep perl beside the app bundle;
/// development builds keep it under the app directory.
///
/// **BUG THIS CATCHES**: Would catch a reordered or mistyped bundled path.
#[test]
fn given_windows_platform_when_program_candidates_called_then_lists_bundled_perl() {
    // GIVEN: A Windows search rooted at an app directory
    let mut search = LauncherSearch::new("C:/Diogenes/app", "C:/Diogenes/resources");
    search.platform = Platform::Windows;

    // WHEN: Listing interpreter candidates
    let candidates = search.program_candidates();

    // THEN: Two bundled locations, the outer one first
    let bundled: PathBuf = ["strawberry", "perl", "bin", "perl.exe"].iter().collect();
    assert_eq!(
        candidates,
        vec![
            Path::new("C:/Diogenes/app").join("..").join("..").join(&bundled),
            Path::new("C:/Diogenes/app").join(&bundled),
        ]
    );
}

/// **VALUE**: Unix relies on PATH; no bundled interpreter is guessed.
#[test]
fn given_unix_platform_when_program_candidates_called_then_returns_none() {
    // GIVEN: A Unix search
    let mut search = LauncherSearch::new("/opt/diogenes", "/opt/diogenes/resources");
    search.platform = Platform::Unix;

    // WHEN/THEN: No bundled candidates
    assert!(search.program_candidates().is_empty());
}

/// **VALUE**: The server script is searched beside and above the resource dir.
///
/// **WHY THIS MATTERS**: Packaged and development trees put `server/` at
/// different depths; both must work without configuration.
#[test]
fn given_resource_dir_when_entry_point_candidates_called_then_searches_upwards() {
    // GIVEN: A search with a resource directory
    let search = LauncherSearch::new("/app", "/app/res");

    // WHEN: Listing entry point candidates
    let candidates = search.entry_point_candidates();

    // THEN: Every candidate ends in the server script under a server/ dir
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0], Path::new("/app/res/server").join(SERVER_SCRIPT));
    for candidate in &candidates {
        assert!(candidate.ends_with(Path::new("server").join(SERVER_SCRIPT)));
    }
}

/// **VALUE**: An interpreter override also drives the stale-kill name check.
///
/// **BUG THIS CATCHES**: With an override of `/usr/local/bin/perl5.36`, checking
/// for plain `perl` still works, but an override like `/bin/sh` must check `sh`
/// or stale servers launched through it are never cleaned up.
#[test]
fn given_program_override_when_program_hint_called_then_uses_override_stem() {
    // GIVEN: Searches with and without an override
    let plain = LauncherSearch::new("/app", "/app/res");
    let mut overridden = LauncherSearch::new("/app", "/app/res");
    overridden.program_override = Some(PathBuf::from("/bin/sh"));

    // WHEN/THEN: The hint follows the override
    assert_eq!(plain.program_hint(), "perl");
    assert_eq!(overridden.program_hint(), "sh");
}

/// **VALUE**: `shell.json` overrides win; absent entries keep caller overrides.
///
/// **BUG THIS CATCHES**: Would catch an empty config wiping an override set
/// programmatically, sending the spawn back to the platform default.
#[test]
fn given_partial_config_when_with_config_then_only_set_entries_override() {
    // GIVEN: A search with both overrides and a config naming only the launcher
    let mut search = LauncherSearch::new("/app", "/res");
    search.program_override = Some(PathBuf::from("/bin/sh"));
    search.entry_point_override = Some(PathBuf::from("/tmp/server.sh"));
    let config = ShellConfig {
        launcher: Some(PathBuf::from("/usr/local/bin/perl")),
        ..ShellConfig::default()
    };

    // WHEN: Applying the config
    let search = search.with_config(&config);

    // THEN: Launcher replaced, entry point kept
    assert_eq!(search.program_override, Some(PathBuf::from("/usr/local/bin/perl")));
    assert_eq!(search.entry_point_override, Some(PathBuf::from("/tmp/server.sh")));
}
