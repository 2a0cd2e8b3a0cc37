//! The process table: the live mapping from spec name to running session.
//!
//! Single owned mapping keyed by spec name. The launcher path and the
//! monitor are its only writers; the status reporter is its only concurrent
//! reader.

use std::collections::HashMap;
use std::process::Child;

use parking_lot::RwLock;
use serde::Serialize;

use crate::profile::ForwardSpec;

/// Lifecycle state of one forwarding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Starting,
    Running,
    Dead,
    Restarting,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Dead => "dead",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
        }
    }
}

/// Runtime record of one spec's forwarding process.
///
/// Owned exclusively by the [`ProcessTable`]; no other component mutates it
/// directly.
#[derive(Debug)]
pub struct Session {
    pub spec: ForwardSpec,
    pub child: Child,
    pub pid: u32,
    pub state: SessionState,
    pub last_error: Option<String>,
}

impl Session {
    /// Creates a running session for a freshly launched child.
    pub fn running(spec: ForwardSpec, child: Child) -> Self {
        let pid = child.id();
        Self {
            spec,
            child,
            pid,
            state: SessionState::Running,
            last_error: None,
        }
    }
}

/// Point-in-time copy of one table entry, safe to hand to readers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub spec: ForwardSpec,
    pub pid: u32,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Mapping from spec name to session.
#[derive(Default)]
pub struct ProcessTable {
    sessions: RwLock<HashMap<String, Session>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for the session's spec name.
    pub fn insert(&self, session: Session) {
        self.sessions
            .write()
            .insert(session.spec.name.clone(), session);
    }

    /// Sets the state of one entry, if present.
    pub fn set_state(&self, name: &str, state: SessionState) {
        if let Some(session) = self.sessions.write().get_mut(name) {
            session.state = state;
        }
    }

    /// Records a failure message on one entry, if present.
    pub fn set_error(&self, name: &str, error: impl Into<String>) {
        if let Some(session) = self.sessions.write().get_mut(name) {
            session.last_error = Some(error.into());
        }
    }

    /// Returns the current state of one entry.
    pub fn state_of(&self, name: &str) -> Option<SessionState> {
        self.sessions.read().get(name).map(|s| s.state)
    }

    /// Returns true if the spec already has a live (`Running` or
    /// `Starting`) entry.
    pub fn is_live(&self, name: &str) -> bool {
        matches!(
            self.state_of(name),
            Some(SessionState::Running) | Some(SessionState::Starting)
        )
    }

    /// Scans `Running` entries, reaping any whose process has exited.
    ///
    /// Exited entries transition to `Dead` with their exit status recorded,
    /// and are returned as (spec, pid) so the caller can log and restart.
    pub fn reap_dead(&self) -> Vec<(ForwardSpec, u32)> {
        let mut sessions = self.sessions.write();
        let mut dead = Vec::new();

        for session in sessions.values_mut() {
            if session.state != SessionState::Running {
                continue;
            }
            match session.child.try_wait() {
                Ok(Some(status)) => {
                    session.state = SessionState::Dead;
                    session.last_error = Some(format!("process exited: {status}"));
                    dead.push((session.spec.clone(), session.pid));
                }
                Ok(None) => {} // Still running
                Err(e) => {
                    session.state = SessionState::Dead;
                    session.last_error = Some(format!("liveness probe failed: {e}"));
                    dead.push((session.spec.clone(), session.pid));
                }
            }
        }

        dead
    }

    /// Returns the specs of entries currently in `Dead` state.
    ///
    /// Covers both freshly reaped sessions and sessions left `Dead` by an
    /// earlier failed restart, so the monitor reattempts them every cycle.
    pub fn dead_specs(&self) -> Vec<ForwardSpec> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.state == SessionState::Dead)
            .map(|s| s.spec.clone())
            .collect()
    }

    /// Returns a snapshot of all entries, sorted by spec name.
    pub fn snapshot(&self) -> Vec<SessionView> {
        let sessions = self.sessions.read();
        let mut views: Vec<SessionView> = sessions
            .values()
            .map(|s| SessionView {
                spec: s.spec.clone(),
                pid: s.pid,
                state: s.state,
                last_error: s.last_error.clone(),
            })
            .collect();
        views.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        views
    }

    /// Removes and returns every entry. Used by the shutdown path.
    pub fn drain(&self) -> Vec<Session> {
        self.sessions.write().drain().map(|(_, s)| s).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ResourceType;
    use std::process::{Command, Stdio};

    fn spec(name: &str) -> ForwardSpec {
        ForwardSpec {
            name: name.to_string(),
            resource_type: ResourceType::Service,
            local_port: 18080,
            remote_port: 80,
        }
    }

    fn spawn_sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    fn spawn_short_lived() -> Child {
        Command::new("true")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    #[test]
    fn test_insert_and_state_transitions() {
        let table = ProcessTable::new();
        let session = Session::running(spec("api"), spawn_sleeper());
        let pid = session.pid;
        table.insert(session);

        assert_eq!(table.len(), 1);
        assert!(table.is_live("api"));
        assert_eq!(table.state_of("api"), Some(SessionState::Running));

        table.set_state("api", SessionState::Restarting);
        assert_eq!(table.state_of("api"), Some(SessionState::Restarting));
        assert!(!table.is_live("api"));

        // Clean up the child
        for mut s in table.drain() {
            let _ = s.child.kill();
            let _ = s.child.wait();
        }
        assert!(pid > 0);
    }

    #[test]
    fn test_reap_dead_marks_exited_sessions() {
        let table = ProcessTable::new();
        let short = spawn_short_lived();
        // Give it time to exit; try_wait in the scan will reap it.
        std::thread::sleep(std::time::Duration::from_millis(100));

        table.insert(Session::running(spec("gone"), short));
        table.insert(Session::running(spec("alive"), spawn_sleeper()));

        let dead = table.reap_dead();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].0.name, "gone");
        assert_eq!(table.state_of("gone"), Some(SessionState::Dead));
        assert_eq!(table.state_of("alive"), Some(SessionState::Running));

        let snapshot = table.snapshot();
        let gone = snapshot.iter().find(|v| v.spec.name == "gone").unwrap();
        assert!(gone.last_error.as_deref().unwrap().contains("exited"));

        for mut s in table.drain() {
            let _ = s.child.kill();
            let _ = s.child.wait();
        }
    }

    #[test]
    fn test_snapshot_is_sorted_and_read_only() {
        let table = ProcessTable::new();
        table.insert(Session::running(spec("zeta"), spawn_sleeper()));
        table.insert(Session::running(spec("alpha"), spawn_sleeper()));

        let snapshot = table.snapshot();
        assert_eq!(snapshot[0].spec.name, "alpha");
        assert_eq!(snapshot[1].spec.name, "zeta");

        // Taking a snapshot does not change table state.
        assert_eq!(table.state_of("zeta"), Some(SessionState::Running));

        for mut s in table.drain() {
            let _ = s.child.kill();
            let _ = s.child.wait();
        }
    }
}
