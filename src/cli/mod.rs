use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::config::ForemanConfig;
use crate::monitor::WorkerMonitor;
use crate::worker::presentation::{available_actions, state_description, state_emoji};

#[derive(Parser)]
#[command(name = "foreman")]
#[command(about = "Lifecycle monitor for autonomous AI coding workers")]
#[command(
    long_about = "Foreman tracks long-running AI coding workers through their lifecycle, \
                  infers state from agent signals, and flags workers that need a restart \
                  or a nudge."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display every tracked worker with its state and idle time
    List {
        /// Emit machine-readable JSON instead of a table
        #[arg(long, help = "Emit the worker table as JSON")]
        json: bool,
    },
    /// Show one worker in detail, including available operator actions
    Status {
        /// Worker identifier
        id: String,
    },
    /// List workers that currently need an intervention
    Attention,
}

/// Run one CLI command against the persisted worker snapshot.
pub async fn run(cli: Cli, config: &ForemanConfig) -> Result<()> {
    let monitor = WorkerMonitor::load_snapshot(
        &config.monitor.snapshot_path,
        config.intervention_policy(),
    )
    .await?;

    match cli.command {
        Commands::List { json } => {
            let now = Utc::now();
            if json {
                println!("{}", serde_json::to_string_pretty(&monitor.snapshot(now))?);
                return Ok(());
            }
            let mut workers: Vec<_> = monitor.workers().collect();
            workers.sort_by(|a, b| a.id.cmp(&b.id));
            for worker in workers {
                println!(
                    "{} {}  {}  idle {}m",
                    state_emoji(worker.state),
                    worker.id,
                    state_description(worker.state),
                    worker.idle_for(now).num_minutes()
                );
            }
        }
        Commands::Status { id } => {
            let worker = monitor
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("Unknown worker: {id}"))?;
            println!(
                "{} {}: {}",
                state_emoji(worker.state),
                worker.id,
                state_description(worker.state)
            );
            println!("  last activity: {}", worker.last_activity);
            if let Some(url) = &worker.pr_url {
                println!("  pull request:  {url}");
            }
            if let Some(error) = &worker.last_error {
                println!("  last error:    {error}");
            }
            println!("  agents run:    {}", worker.agents_run.join(", "));
            let actions: Vec<String> = available_actions(worker.state)
                .iter()
                .map(|a| format!("{a:?}").to_lowercase())
                .collect();
            println!("  actions:       {}", actions.join(", "));
        }
        Commands::Attention => {
            let now = Utc::now();
            let flagged = monitor.evaluate_all(now);
            if flagged.is_empty() {
                println!("All workers healthy");
                return Ok(());
            }
            for (id, decision) in flagged {
                let action = decision
                    .action
                    .map(|a| format!("{a:?}").to_lowercase())
                    .unwrap_or_default();
                println!("{id}: {action}");
            }
        }
    }

    Ok(())
}
