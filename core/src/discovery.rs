//! kubectl discovery and the one-shot cluster connectivity check.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Well-known locations searched after $PATH.
const KUBECTL_PATHS: &[&str] = &[
    "/opt/homebrew/bin/kubectl", // Apple Silicon
    "/usr/local/bin/kubectl",    // Intel Mac / Homebrew
    "/usr/bin/kubectl",          // System
];

/// Timeout for the cluster connectivity check.
const CLUSTER_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Locates kubectl and performs the pre-launch cluster check.
pub struct Discovery {
    kubectl_path: Option<PathBuf>,
}

impl Discovery {
    /// Creates a new Discovery, searching for kubectl.
    pub fn new() -> Self {
        Self {
            kubectl_path: find_kubectl(),
        }
    }

    /// Creates a Discovery with a fixed kubectl path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            kubectl_path: Some(path),
        }
    }

    /// Returns the kubectl path, or a fatal error if absent.
    pub fn kubectl_path(&self) -> Result<&PathBuf> {
        self.kubectl_path.as_ref().ok_or(Error::KubectlNotFound)
    }

    /// Returns true if kubectl is available.
    pub fn is_kubectl_available(&self) -> bool {
        self.kubectl_path.is_some()
    }

    /// Checks that the cluster answers before any session is launched.
    ///
    /// Failure is fatal and aborts the run.
    pub async fn check_cluster(&self, context: Option<&str>) -> Result<()> {
        let kubectl_path = self.kubectl_path()?;

        let mut args: Vec<String> = Vec::new();
        if let Some(ctx) = context {
            args.push("--context".to_string());
            args.push(ctx.to_string());
        }
        args.push("cluster-info".to_string());
        args.push("--request-timeout=5s".to_string());

        let result = timeout(CLUSTER_CHECK_TIMEOUT, async {
            Command::new(kubectl_path).args(&args).output().await
        })
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::ClusterUnreachable(
                    stderr.lines().next().unwrap_or("kubectl failed").to_string(),
                ))
            }
            Ok(Err(e)) => Err(Error::ClusterUnreachable(e.to_string())),
            Err(_) => Err(Error::ClusterUnreachable(
                "connectivity check timed out".to_string(),
            )),
        }
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds kubectl in $PATH, then the well-known locations.
fn find_kubectl() -> Option<PathBuf> {
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join("kubectl");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    KUBECTL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}
