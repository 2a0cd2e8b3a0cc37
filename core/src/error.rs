//! Error types for the kubeward-core library.

use thiserror::Error;

use crate::launcher::LaunchError;

/// Result type alias for kubeward operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving a profile and supervising sessions.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration store could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The named profile does not exist in the store.
    #[error("Profile '{name}' not found. Available profiles: {}", format_available(.available))]
    ProfileNotFound { name: String, available: Vec<String> },

    /// The profile failed validation before launch.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// kubectl was not found on this host.
    #[error("kubectl not found in PATH or well-known locations")]
    KubectlNotFound,

    /// The cluster did not answer the startup connectivity check.
    #[error("Cluster unreachable: {0}")]
    ClusterUnreachable(String),

    /// Every spec in the profile failed its initial launch.
    #[error("All port-forward sessions failed to launch")]
    AllLaunchesFailed,

    /// A single session failed to launch.
    #[error("Launch failed: {0}")]
    Launch(#[from] LaunchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}
