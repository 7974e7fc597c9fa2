//! Reload signalling for the local unbound process.
//!
//! Unbound re-reads its configuration on SIGHUP. The pid file may be missing
//! (unbound not started yet) or stale (left behind by a crash); neither is an
//! error for the sync agent, which has already materialized the records.

use std::fs;
use std::path::PathBuf;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

/// Result of a reload attempt. `Skipped` is a warning, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// SIGHUP was delivered to a live unbound process.
    Triggered,
    /// No live process to signal; details were logged.
    Skipped,
}

/// Signals the unbound process named by a pid file.
#[derive(Debug, Clone)]
pub struct UnboundReloader {
    pidfile: PathBuf,
}

impl UnboundReloader {
    pub fn new(pidfile: PathBuf) -> Self {
        Self { pidfile }
    }

    /// Read the pid file, verify the process is alive, and send SIGHUP.
    /// Fire-and-forget: never waits for the reload to complete.
    pub fn reload(&self) -> ReloadOutcome {
        let contents = match fs::read_to_string(&self.pidfile) {
            Ok(contents) => contents,
            Err(_) => {
                warn!(
                    pidfile = %self.pidfile.display(),
                    "could not find unbound pidfile, not reloading"
                );
                return ReloadOutcome::Skipped;
            }
        };

        let pid = match contents.lines().next().unwrap_or("").trim().parse::<i32>() {
            Ok(pid) if pid > 0 => Pid::from_raw(pid),
            _ => {
                warn!(
                    pidfile = %self.pidfile.display(),
                    "unbound pidfile does not contain a pid, not reloading"
                );
                return ReloadOutcome::Skipped;
            }
        };

        // Probe the process table; the pid file alone proves nothing after a
        // crash. The stale file is left in place for the operator.
        if kill(pid, None).is_err() {
            warn!(
                %pid,
                pidfile = %self.pidfile.display(),
                "stale unbound pidfile, not reloading"
            );
            return ReloadOutcome::Skipped;
        }

        match kill(pid, Signal::SIGHUP) {
            Ok(()) => {
                info!(%pid, "reloading unbound instance");
                ReloadOutcome::Triggered
            }
            Err(err) => {
                warn!(%pid, error = %err, "failed to signal unbound");
                ReloadOutcome::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn missing_pidfile_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let reloader = UnboundReloader::new(tmp.path().join("unbound.pid"));
        assert_eq!(reloader.reload(), ReloadOutcome::Skipped);
    }

    #[test]
    fn unparseable_pidfile_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let pidfile = tmp.path().join("unbound.pid");
        fs::write(&pidfile, "not-a-pid\n").unwrap();
        assert_eq!(UnboundReloader::new(pidfile).reload(), ReloadOutcome::Skipped);
    }

    #[test]
    fn stale_pid_is_skipped_and_file_kept() {
        let tmp = TempDir::new().unwrap();
        let pidfile = tmp.path().join("unbound.pid");
        // Near PID_MAX, essentially guaranteed unused.
        fs::write(&pidfile, "3999999\n").unwrap();

        assert_eq!(UnboundReloader::new(pidfile.clone()).reload(), ReloadOutcome::Skipped);
        assert!(pidfile.exists(), "stale pidfile must not be deleted");
    }

    #[test]
    fn live_pid_is_signalled() {
        let tmp = TempDir::new().unwrap();
        let pidfile = tmp.path().join("unbound.pid");

        // SIGHUP terminates sleep by default, which doubles as proof of
        // delivery.
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(&pidfile, format!("{}\n", child.id())).unwrap();

        assert_eq!(UnboundReloader::new(pidfile).reload(), ReloadOutcome::Triggered);

        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
