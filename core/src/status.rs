//! On-demand status snapshot of the process table.
//!
//! Strictly read-only: the reporter combines a non-reaping process probe
//! (signal 0) with an independent TCP probe of each declared local port.
//! Any inconsistency it observes is informational and left for the next
//! monitor cycle to act on.

use chrono::{DateTime, Local};
use nix::sys::signal::kill;
use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use serde::Serialize;

use crate::launcher::is_port_open;
use crate::table::{ProcessTable, SessionState};

/// Three-way session health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Process alive and port listening.
    Healthy,
    /// Process alive but port not listening.
    Degraded,
    /// Process not alive.
    Dead,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Dead => "dead",
        }
    }
}

/// Status of one table entry at snapshot time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub name: String,
    pub resource: String,
    pub local_port: u16,
    pub remote_port: u16,
    pub pid: u32,
    pub state: SessionState,
    pub health: Health,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Point-in-time view of every supervised session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Local>,
    pub sessions: Vec<SessionStatus>,
}

impl StatusSnapshot {
    /// Renders a human-readable table.
    pub fn render(&self) -> String {
        if self.sessions.is_empty() {
            return "No supervised sessions.".to_string();
        }

        let mut out = format!(
            "{:<16} {:<24} {:<7} {:<7} {:<8} {:<11} HEALTH\n",
            "NAME", "RESOURCE", "LOCAL", "REMOTE", "PID", "STATE"
        );
        out.push_str(&"-".repeat(80));
        out.push('\n');

        for s in &self.sessions {
            out.push_str(&format!(
                "{:<16} {:<24} {:<7} {:<7} {:<8} {:<11} {}\n",
                s.name,
                s.resource,
                s.local_port,
                s.remote_port,
                s.pid,
                s.state.as_str(),
                s.health.as_str()
            ));
        }

        out.push_str(&format!("\nTotal: {} sessions", self.sessions.len()));
        out
    }
}

/// Classifies health from the two independent liveness signals.
pub fn classify(process_alive: bool, port_listening: bool) -> Health {
    match (process_alive, port_listening) {
        (true, true) => Health::Healthy,
        (true, false) => Health::Degraded,
        (false, _) => Health::Dead,
    }
}

/// Probes a process without reaping it.
///
/// Signal 0 alone reports an exited-but-unreaped child as alive, and a
/// session that died between poll cycles is exactly that. `WNOWAIT` peeks
/// at the exit without consuming it; reaping stays the monitor's job.
fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_raw(pid as i32);
    match waitid(
        Id::Pid(pid),
        WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT,
    ) {
        Ok(WaitStatus::StillAlive) => true,
        Ok(_) => false, // exited, not yet reaped
        // Not our child (already reaped, or never ours): fall back to the
        // signal-0 probe.
        Err(_) => kill(pid, None).is_ok(),
    }
}

/// Builds a snapshot from the table. Never mutates session state.
pub fn report(table: &ProcessTable) -> StatusSnapshot {
    let sessions = table
        .snapshot()
        .into_iter()
        .map(|view| {
            let alive = process_alive(view.pid);
            let listening = is_port_open(view.spec.local_port);
            SessionStatus {
                name: view.spec.name.clone(),
                resource: view.spec.resource_ref(),
                local_port: view.spec.local_port,
                remote_port: view.spec.remote_port,
                pid: view.pid,
                state: view.state,
                health: classify(alive, listening),
                last_error: view.last_error,
            }
        })
        .collect();

    StatusSnapshot {
        taken_at: Local::now(),
        sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ForwardSpec, ResourceType};
    use crate::table::Session;
    use std::process::{Command, Stdio};

    #[test]
    fn test_classify() {
        assert_eq!(classify(true, true), Health::Healthy);
        assert_eq!(classify(true, false), Health::Degraded);
        assert_eq!(classify(false, true), Health::Dead);
        assert_eq!(classify(false, false), Health::Dead);
    }

    fn spec(name: &str, local_port: u16) -> ForwardSpec {
        ForwardSpec {
            name: name.to_string(),
            resource_type: ResourceType::Service,
            local_port,
            remote_port: 80,
        }
    }

    #[test]
    fn test_report_degraded_for_non_listening_process() {
        let table = ProcessTable::new();
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        table.insert(Session::running(spec("api", 19701), child));

        let snapshot = report(&table);
        assert_eq!(snapshot.sessions.len(), 1);
        // Alive but nothing listens on the port.
        assert_eq!(snapshot.sessions[0].health, Health::Degraded);

        // Reporting never mutates table state.
        assert_eq!(
            table.state_of("api"),
            Some(crate::table::SessionState::Running)
        );

        for mut s in table.drain() {
            let _ = s.child.kill();
            let _ = s.child.wait();
        }
    }

    #[test]
    fn test_report_dead_for_unreaped_session() {
        use nix::sys::signal::Signal;

        let table = ProcessTable::new();
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id();
        table.insert(Session::running(spec("api", 19703), child));

        // Killed out-of-band; the monitor has not reaped it yet.
        kill(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(100));

        let snapshot = report(&table);
        assert_eq!(snapshot.sessions[0].health, Health::Dead);
        // The table still says Running; reaping is the monitor's job.
        assert_eq!(
            table.state_of("api"),
            Some(crate::table::SessionState::Running)
        );

        for mut s in table.drain() {
            let _ = s.child.kill();
            let _ = s.child.wait();
        }
    }

    #[test]
    fn test_report_dead_for_exited_process() {
        let table = ProcessTable::new();
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        child.kill().unwrap();
        child.wait().unwrap();
        table.insert(Session::running(spec("api", 19702), child));

        let snapshot = report(&table);
        assert_eq!(snapshot.sessions[0].health, Health::Dead);
        // Informational only: the table still says Running until the next
        // monitor cycle reaps it.
        assert_eq!(
            table.state_of("api"),
            Some(crate::table::SessionState::Running)
        );

        table.drain();
    }

    #[test]
    fn test_render_empty() {
        let snapshot = StatusSnapshot {
            taken_at: Local::now(),
            sessions: vec![],
        };
        assert_eq!(snapshot.render(), "No supervised sessions.");
    }
}
