//! Shared test fixtures: executable stub scripts standing in for kubectl.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Ignores its arguments and sleeps, standing in for a healthy
/// long-running forwarder.
pub(crate) fn stub_forwarder(dir: &Path) -> PathBuf {
    write_script(dir, "forwarder-stub", "#!/bin/sh\nexec sleep 30\n")
}

/// Succeeds on the first invocation, fails immediately on every later one.
/// Used to exercise the restart-failure path.
pub(crate) fn stub_one_shot(dir: &Path) -> PathBuf {
    let marker = dir.join("launched.marker");
    let body = format!(
        "#!/bin/sh\nif [ -e \"{m}\" ]; then\n  echo 'forwarder refused' >&2\n  exit 1\nfi\ntouch \"{m}\"\nexec sleep 30\n",
        m = marker.display()
    );
    write_script(dir, "one-shot-stub", &body)
}
