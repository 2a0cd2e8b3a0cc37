//! The supervisor: initial launch, the monitor loop, and escalating
//! shutdown.
//!
//! One long-lived control loop polls the process table for dead sessions
//! and restarts them through the launcher, one attempt per cycle, forever.
//! Shutdown interrupts the inter-cycle wait, never a scan in progress.

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::logsink::{LogLevel, LogSink};
use crate::profile::Profile;
use crate::status::{self, StatusSnapshot};
use crate::table::{ProcessTable, SessionState};

/// Fixed period of the monitor loop.
const POLL_PERIOD: Duration = Duration::from_secs(5);

/// Grace window before force-killing a session at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Fixed waits used by the supervisor; overridable in tests.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub poll_period: Duration,
    pub shutdown_grace: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_period: POLL_PERIOD,
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }
}

/// Supervises one profile's forwarding sessions.
pub struct Supervisor {
    profile: Profile,
    launcher: Launcher,
    table: ProcessTable,
    log: LogSink,
    timing: Timing,
}

impl Supervisor {
    pub fn new(profile: Profile, launcher: Launcher, log: LogSink) -> Self {
        Self {
            profile,
            launcher,
            table: ProcessTable::new(),
            log,
            timing: Timing::default(),
        }
    }

    /// Overrides the fixed waits.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn session_count(&self) -> usize {
        self.table.len()
    }

    // =========================================================================
    // Initial launch
    // =========================================================================

    /// Launches every spec in the profile.
    ///
    /// A failed launch is reported and the remaining specs are still
    /// attempted; only all specs failing aborts the run.
    pub async fn launch_all(&self) -> Result<usize> {
        let mut launched = 0;

        for spec in self.profile.forwards.clone() {
            if self.table.is_live(&spec.name) {
                continue;
            }

            match self.launcher.launch(&self.profile, &spec).await {
                Ok(session) => {
                    info!(name = %spec.name, pid = session.pid, "session launched");
                    self.log_info(format!(
                        "launched '{}' ({} {} -> {}) pid {}",
                        spec.name,
                        spec.resource_ref(),
                        spec.local_port,
                        spec.remote_port,
                        session.pid
                    ));
                    self.table.insert(session);
                    launched += 1;
                }
                Err(e) => {
                    warn!(name = %spec.name, error = %e, "launch failed");
                    self.log_error(format!("failed to launch '{}': {}", spec.name, e));
                }
            }
        }

        if launched == 0 {
            return Err(Error::AllLaunchesFailed);
        }
        Ok(launched)
    }

    // =========================================================================
    // Monitor loop
    // =========================================================================

    /// One monitor cycle: reap dead sessions and attempt one restart each.
    ///
    /// A restart that fails leaves the session `Dead`; the next cycle
    /// reattempts it. Unbounded, no backoff.
    pub async fn poll_once(&self) {
        for (spec, pid) in self.table.reap_dead() {
            error!(name = %spec.name, pid, "session died");
            self.log_error(format!("session '{}' (pid {}) died", spec.name, pid));
        }

        // Freshly reaped sessions and sessions left Dead by an earlier
        // failed restart alike: one attempt each, every cycle.
        for spec in self.table.dead_specs() {
            self.table.set_state(&spec.name, SessionState::Restarting);
            match self.launcher.launch(&self.profile, &spec).await {
                Ok(session) => {
                    info!(name = %spec.name, pid = session.pid, "session restarted");
                    self.log_info(format!(
                        "restarted '{}' pid {}",
                        spec.name, session.pid
                    ));
                    self.table.insert(session);
                }
                Err(e) => {
                    warn!(name = %spec.name, error = %e, "restart failed");
                    self.table.set_state(&spec.name, SessionState::Dead);
                    self.table.set_error(&spec.name, e.to_string());
                    self.log_error(format!("restart of '{}' failed: {}", spec.name, e));
                }
            }
        }
    }

    /// Runs the monitor loop until the shutdown channel fires, then
    /// performs the escalating shutdown.
    ///
    /// Only the inter-cycle wait is cancellable; a scan in progress always
    /// completes.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.timing.poll_period) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops all live sessions with graceful-then-forced escalation and
    /// clears the table.
    ///
    /// Idempotent: with no live sessions this logs the shutdown event and
    /// does nothing else.
    pub async fn shutdown(&self) {
        info!("shutdown requested");
        self.log_info("shutdown requested");

        let mut sessions = self.table.drain();
        if sessions.is_empty() {
            return;
        }

        for session in &mut sessions {
            if session.state == SessionState::Stopped {
                continue;
            }
            // A Dead session's child was already reaped; its pid may have
            // been reused by an unrelated process. Never signal those.
            if matches!(session.child.try_wait(), Ok(Some(_))) {
                continue;
            }
            let _ = kill(Pid::from_raw(session.pid as i32), Signal::SIGTERM);
        }

        tokio::time::sleep(self.timing.shutdown_grace).await;

        for session in &mut sessions {
            match session.child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    // Did not honor SIGTERM within the grace window.
                    warn!(name = %session.spec.name, pid = session.pid, "force-killing session");
                    self.log_error(format!(
                        "session '{}' (pid {}) force-killed after grace window",
                        session.spec.name, session.pid
                    ));
                    let _ = session.child.kill();
                }
            }
            let _ = session.child.wait(); // Reap to avoid zombies
            session.state = SessionState::Stopped;
            self.log_info(format!("session '{}' stopped", session.spec.name));
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Read-only snapshot of all sessions; safe to call from an
    /// out-of-band trigger while a cycle is in flight.
    pub fn report(&self) -> StatusSnapshot {
        status::report(&self.table)
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn log_info(&self, message: impl Into<String>) {
        if let Err(e) = self.log.append(LogLevel::Info, message) {
            warn!(error = %e, "log write failed");
        }
    }

    fn log_error(&self, message: impl Into<String>) {
        if let Err(e) = self.log.append(LogLevel::Error, message) {
            warn!(error = %e, "log write failed");
        }
    }
}
