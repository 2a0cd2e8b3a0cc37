//! Run command - supervise a profile until interrupted.
//!
//! SIGINT/SIGTERM trigger the graceful shutdown; SIGUSR1 prints a status
//! snapshot without disturbing the monitor loop.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use kubeward_core::{Discovery, Launcher, LogSink, ProfileStore, Supervisor};

pub async fn run(profile_name: &str, json: bool) -> Result<()> {
    let store = ProfileStore::new()?;
    let profile = store.get_profile(profile_name).await?;
    profile.validate()?;

    let discovery = Discovery::new();
    let kubectl_path = discovery.kubectl_path()?.clone();

    eprintln!("Checking cluster connectivity...");
    discovery.check_cluster(profile.context.as_deref()).await?;

    let supervisor = Arc::new(Supervisor::new(
        profile,
        Launcher::new(kubectl_path),
        LogSink::new()?,
    ));

    let launched = supervisor.launch_all().await?;
    eprintln!(
        "Supervising {} session(s) for profile '{}'. \
         Send SIGUSR1 for status, Ctrl-C to stop.",
        launched, profile_name
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.run(shutdown_rx).await })
    };

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    loop {
        tokio::select! {
            _ = sigint.recv() => break,
            _ = sigterm.recv() => break,
            _ = sigusr1.recv() => {
                print_status(&supervisor, json)?;
            }
        }
    }

    eprintln!("Shutting down...");
    shutdown_tx.send(true)?;
    monitor.await?;
    eprintln!("All sessions stopped.");

    Ok(())
}

fn print_status(supervisor: &Supervisor, json: bool) -> Result<()> {
    let snapshot = supervisor.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", snapshot.render());
    }
    Ok(())
}
