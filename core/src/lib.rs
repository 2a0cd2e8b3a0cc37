//! Kubeward Core Library
//!
//! Supervisor for kubectl port-forward sessions. Provides functionality to:
//! - Resolve named forwarding profiles from the config store
//! - Launch one forwarding process per rule with a startup grace check
//! - Monitor session liveness and restart dead sessions every poll cycle
//! - Report three-way session health on demand
//! - Stop all sessions with graceful-then-forced escalation
//!
//! # Architecture
//! - `profile` / `config`: forwarding rules and their JSON store
//! - `discovery`: kubectl lookup and the startup cluster check
//! - `launcher` / `table`: process lifecycle and the live session mapping
//! - `supervisor`: the monitor loop and shutdown controller
//! - `status`: read-only health snapshots
//! - `logsink`: rotating JSON-lines event log
//!
//! # Platform Support
//! Unix only: sessions are controlled with SIGTERM/SIGKILL and probed with
//! signal 0.

pub mod config;
pub mod discovery;
pub mod error;
pub mod launcher;
pub mod logsink;
pub mod profile;
pub mod status;
pub mod supervisor;
pub mod table;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use config::{ProfileConfig, ProfileStore};
pub use discovery::Discovery;
pub use error::{Error, Result};
pub use launcher::{LaunchError, Launcher};
pub use logsink::{LogEntry, LogLevel, LogSink};
pub use profile::{ForwardSpec, Profile, ResourceType};
pub use status::{Health, SessionStatus, StatusSnapshot};
pub use supervisor::{Supervisor, Timing};
pub use table::{ProcessTable, Session, SessionState};
