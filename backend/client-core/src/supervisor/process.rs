use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, trace, warn};
use sysinfo::{Pid, Process, ProcessesToUpdate, Signal, System};

const KILL_VERIFY_MAX_ELAPSED: Duration = Duration::from_secs(5);

/// Outcome of signalling a pid recorded in a stale lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleKill {
    /// Nothing runs under that pid any more.
    NotRunning,
    /// The pid is protected or belongs to an unrelated program.
    Refused,
    /// Signalled and confirmed gone.
    Terminated,
    /// Signalled (or tried to) but still alive after the grace period.
    Survived,
}

#[track_caller]
pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid).map(f)
}

pub(crate) fn format_command(process: &Process) -> String {
    process
        .cmd()
        .iter()
        .map(|s| s.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pids a stale-lock cleanup must never signal.
pub(crate) fn is_protected_pid(pid: u32) -> bool {
    pid <= 1 || pid == std::process::id()
}

/// Whether `process` looks like something we could have launched.
///
/// Pids are reused; a stale lock file from last week may name a browser tab.
pub(crate) fn looks_like_server(process: &Process, program_hint: &str) -> bool {
    let hint = program_hint.to_lowercase();
    let name = process.name().to_string_lossy().to_lowercase();
    name.contains(&hint) || format_command(process).to_lowercase().contains(&hint)
}

/// Send SIGTERM where supported, falling back to a hard kill.
fn signal(process: &Process) -> bool {
    match process.kill_with(Signal::Term) {
        Some(sent) => {
            debug!("Sent SIGTERM to PID {}: success={sent}", process.pid());
            sent
        }
        None => {
            let killed = process.kill();
            debug!("Sent kill to PID {}: success={killed}", process.pid());
            killed
        }
    }
}

/// Terminate the server recorded in a stale lock file.
///
/// Blocks for up to five seconds while verifying the process is gone, so call it
/// from a blocking context. Every failure is reported, never raised.
pub fn terminate_stale(pid: u32, program_hint: &str) -> StaleKill {
    if is_protected_pid(pid) {
        warn!("Refusing to signal protected PID {pid}");
        return StaleKill::Refused;
    }

    let signalled = with_process(pid, |p| {
        if !looks_like_server(p, program_hint) {
            warn!(
                "PID {pid} is '{}', not a {program_hint} server; leaving it alone",
                p.name().to_string_lossy()
            );
            return None;
        }
        Some(signal(p))
    });

    match signalled {
        None => {
            debug!("Stale server PID {pid} no longer exists");
            return StaleKill::NotRunning;
        }
        Some(None) => return StaleKill::Refused,
        Some(Some(false)) => {
            warn!("Failed to signal stale server PID {pid}");
            return StaleKill::Survived;
        }
        Some(Some(true)) => {}
    }

    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(KILL_VERIFY_MAX_ELAPSED),
        ..Default::default()
    };

    loop {
        if with_process(pid, |_| true).is_none() {
            debug!("Stale server PID {pid} terminated");
            return StaleKill::Terminated;
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("PID {pid} still alive, retrying after {duration:?}");
                sleep(duration);
            }
            None => {
                warn!("Stale server PID {pid} still running after {KILL_VERIFY_MAX_ELAPSED:?}");
                return StaleKill::Survived;
            }
        }
    }
}

/// Ask a supervised child to exit gracefully. Returns whether a signal went out.
pub(crate) fn request_termination(pid: u32) -> bool {
    with_process(pid, signal).unwrap_or(false)
}
