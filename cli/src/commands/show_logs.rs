//! Show-logs command - dump recent supervisor log entries.

use anyhow::Result;
use kubeward_core::LogSink;

pub fn run(lines: usize, json: bool) -> Result<()> {
    let sink = LogSink::new()?;
    let entries = sink.tail(lines)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries.");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} {:<5} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.level.as_str(),
            entry.message
        );
    }

    Ok(())
}
