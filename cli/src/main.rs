//! Kubeward CLI - Supervise kubectl port-forward profiles
//!
//! A command-line supervisor that launches the forwarding sessions of a
//! named profile, restarts them when they die, and shuts them down cleanly.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kubeward")]
#[command(author, version, about = "Supervise kubectl port-forward profiles")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise the forwarding sessions of a profile until interrupted
    Run {
        /// Profile name from ~/.kubeward/profiles.json
        profile: String,
    },

    /// List configured profiles
    #[command(alias = "ls")]
    Profiles,

    /// Show recent supervisor log entries
    ShowLogs {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { profile } => {
            commands::run::run(&profile, cli.json).await?;
        }
        Commands::Profiles => {
            commands::profiles::list(cli.json).await?;
        }
        Commands::ShowLogs { lines } => {
            commands::show_logs::run(lines, cli.json)?;
        }
    }

    Ok(())
}
