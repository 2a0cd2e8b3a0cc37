//! Session launcher: spawns one kubectl port-forward process per spec.

use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;

use crate::profile::{ForwardSpec, Profile};
use crate::table::Session;

/// Startup window used to distinguish an immediate crash from a healthy
/// long-running process.
const LAUNCH_GRACE: Duration = Duration::from_secs(1);

/// Timeout for the local port probe.
const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Maximum diagnostic lines captured from a crashed child.
const MAX_DIAGNOSTIC_LINES: usize = 20;

/// Errors local to one spec's launch; non-fatal to the supervisor.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Something already accepts connections on the local port.
    #[error("local port {0} is already in use")]
    PortInUse(u16),

    /// The child could not be spawned at all.
    #[error("failed to spawn forwarder: {0}")]
    Spawn(String),

    /// The child exited within the startup grace window.
    #[error("forwarder exited immediately: {diagnostics}")]
    ImmediateExit { diagnostics: String },
}

/// Launches forwarding sessions and confirms they survive startup.
pub struct Launcher {
    kubectl_path: PathBuf,
    grace: Duration,
}

impl Launcher {
    pub fn new(kubectl_path: PathBuf) -> Self {
        Self {
            kubectl_path,
            grace: LAUNCH_GRACE,
        }
    }

    /// Overrides the startup grace window.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Launches one forwarding session.
    ///
    /// Probes the local port before spawning, then waits the grace window
    /// and confirms the child is still alive. Returns a `Running` session
    /// on success.
    pub async fn launch(
        &self,
        profile: &Profile,
        spec: &ForwardSpec,
    ) -> Result<Session, LaunchError> {
        if is_port_open(spec.local_port) {
            return Err(LaunchError::PortInUse(spec.local_port));
        }

        let mut args: Vec<String> = Vec::new();
        if let Some(ctx) = &profile.context {
            args.push("--context".to_string());
            args.push(ctx.clone());
        }
        args.push("port-forward".to_string());
        args.push("-n".to_string());
        args.push(profile.namespace.clone());
        args.push(spec.resource_ref());
        args.push(spec.port_pair());
        args.push("--address=127.0.0.1".to_string());

        let mut child = Command::new(&self.kubectl_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaunchError::Spawn(e.to_string()))?;

        tokio::time::sleep(self.grace).await;

        match child.try_wait() {
            Ok(None) => Ok(Session::running(spec.clone(), child)),
            Ok(Some(status)) => {
                let mut diagnostics = read_stderr(&mut child);
                if diagnostics.is_empty() {
                    diagnostics = format!("exit status: {status}");
                }
                Err(LaunchError::ImmediateExit { diagnostics })
            }
            Err(e) => Err(LaunchError::Spawn(e.to_string())),
        }
    }
}

/// Checks if something is listening on 127.0.0.1:port.
///
/// Used both as the pre-launch availability probe (open means conflict) and
/// as the status reporter's secondary liveness signal (open means healthy).
pub fn is_port_open(port: u16) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpStream::connect_timeout(&addr, PORT_PROBE_TIMEOUT).is_ok()
}

/// Drains captured stderr from an exited child.
fn read_stderr(child: &mut std::process::Child) -> String {
    let Some(stderr) = child.stderr.take() else {
        return String::new();
    };
    let reader = BufReader::new(stderr);
    reader
        .lines()
        .map_while(|line| line.ok())
        .take(MAX_DIAGNOSTIC_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ResourceType;
    use std::net::TcpListener;

    fn profile() -> Profile {
        Profile {
            context: None,
            namespace: "default".to_string(),
            forwards: vec![],
        }
    }

    fn spec(local_port: u16) -> ForwardSpec {
        ForwardSpec {
            name: "api".to_string(),
            resource_type: ResourceType::Deployment,
            local_port,
            remote_port: 80,
        }
    }

    #[tokio::test]
    async fn test_port_in_use_detected_before_spawn() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        // kubectl path would fail if spawned; the probe must fail first.
        let launcher = Launcher::new(PathBuf::from("/bin/false"));
        let err = launcher.launch(&profile(), &spec(port)).await.unwrap_err();
        assert!(matches!(err, LaunchError::PortInUse(p) if p == port));
    }

    #[tokio::test]
    async fn test_immediate_exit_reported() {
        let launcher = Launcher::new(PathBuf::from("/bin/false"))
            .with_grace(Duration::from_millis(100));
        let err = launcher.launch(&profile(), &spec(19999)).await.unwrap_err();
        assert!(matches!(err, LaunchError::ImmediateExit { .. }));
    }

    #[tokio::test]
    async fn test_successful_launch_yields_running_session() {
        let dir = tempfile::tempdir().unwrap();
        let stub = crate::testutil::stub_forwarder(dir.path());

        let launcher = Launcher::new(stub).with_grace(Duration::from_millis(100));
        let mut session = launcher.launch(&profile(), &spec(19998)).await.unwrap();

        assert_eq!(session.state, crate::table::SessionState::Running);
        assert!(session.pid > 0);

        let _ = session.child.kill();
        let _ = session.child.wait();
    }

    #[test]
    fn test_is_port_open() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(is_port_open(port));
        drop(listener);
        assert!(!is_port_open(port));
    }
}
