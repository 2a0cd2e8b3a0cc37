//! Append-only JSON-lines log with size-based rotation.
//!
//! One entry per line at `~/.kubeward/kubeward.log`. When the active file
//! exceeds 1 MiB it is archived to `kubeward.log.1` (replacing any previous
//! archive) and a fresh file is started.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rotation threshold for the active log file.
const MAX_LOG_BYTES: u64 = 1024 * 1024; // 1 MiB

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

/// One appended log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Rotating log sink.
pub struct LogSink {
    path: PathBuf,
    max_bytes: u64,
    // Serializes append+rotate so concurrent writers cannot interleave.
    write_lock: Mutex<()>,
}

impl LogSink {
    /// Creates a sink at the default path (~/.kubeward/kubeward.log).
    pub fn new() -> Result<Self> {
        let log_dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not find home directory".to_string()))?
            .join(".kubeward");

        Ok(Self::with_path(log_dir.join("kubeward.log")))
    }

    /// Creates a sink at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            max_bytes: MAX_LOG_BYTES,
            write_lock: Mutex::new(()),
        }
    }

    /// Overrides the rotation threshold.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Returns the active log file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn archive_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".1");
        PathBuf::from(name)
    }

    /// Appends one entry, rotating afterwards if the file grew past the
    /// threshold.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        };
        let line = serde_json::to_string(&entry)?;

        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        if file.metadata()?.len() > self.max_bytes {
            fs::rename(&self.path, self.archive_path())?;
        }

        Ok(())
    }

    /// Returns the last `n` entries in chronological order, reading the
    /// archive first when the active file holds fewer than `n`.
    pub fn tail(&self, n: usize) -> Result<Vec<LogEntry>> {
        let _guard = self.write_lock.lock();

        let mut entries = Vec::new();
        for path in [self.archive_path(), self.path.clone()] {
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            entries.extend(
                content
                    .lines()
                    .filter_map(|line| serde_json::from_str::<LogEntry>(line).ok()),
            );
        }

        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}
