//! Profiles command - list configured profiles.

use anyhow::Result;
use kubeward_core::ProfileStore;

pub async fn list(json: bool) -> Result<()> {
    let store = ProfileStore::new()?;
    let config = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if config.profiles.is_empty() {
        println!("No profiles configured. Add them to {}.", store.config_path().display());
        return Ok(());
    }

    println!("{:<20} {:<16} {:<10} FORWARDS", "PROFILE", "NAMESPACE", "CONTEXT");
    println!("{}", "-".repeat(70));
    for (name, profile) in &config.profiles {
        println!(
            "{:<20} {:<16} {:<10} {}",
            name,
            profile.namespace,
            profile.context.as_deref().unwrap_or("(active)"),
            profile.forwards.len()
        );
    }

    Ok(())
}
