//! gddns - dynamic DNS updater for dyndns2-compatible providers.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gddns::config::{Config, Overrides};
use gddns::updater::{Outcome, Updater};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SYSTEM_CONFIG: &str = "/etc/gddns.conf";

#[derive(Parser)]
#[command(name = "gddns")]
#[command(about = "Update a dynamic DNS record when the host's public address changes")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the record if the public address changed (default)
    Update {
        /// Don't make any changes
        #[arg(long)]
        dryrun: bool,

        /// Update even if the record already matches
        #[arg(short, long)]
        force: bool,
    },

    /// Show the discovered address and the published record
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-check on an interval
    Daemon {
        /// Check interval in seconds
        #[arg(short, long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Don't make any changes
        #[arg(long)]
        dryrun: bool,
    },

    /// Validate configuration
    Validate,
}

/// Config locations in lookup order: system file first, then the user's.
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(SYSTEM_CONFIG)];
    candidates.extend(dirs::config_dir().map(|p| p.join("gddns/config.toml")));
    candidates
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    config_candidates()
        .into_iter()
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG))
}

fn load_config(path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<Config> {
    let config_path = get_config_path(path);
    tracing::debug!("Using config {}", config_path.display());

    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .with_overrides(overrides);
    config.validate()?;
    config.resolve_password()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.overrides)?;

    match cli.command.unwrap_or(Commands::Update {
        dryrun: false,
        force: false,
    }) {
        Commands::Update { dryrun, force } => {
            cmd_update(config, dryrun, force).await?;
        }
        Commands::Status { json } => {
            cmd_status(config, json).await?;
        }
        Commands::Daemon { interval, dryrun } => {
            cmd_daemon(config, interval, dryrun).await?;
        }
        Commands::Validate => {
            cmd_validate(config).await?;
        }
    }

    Ok(())
}

async fn cmd_update(config: Config, dryrun: bool, force: bool) -> anyhow::Result<()> {
    let updater = Updater::from_config(&config)?;
    updater
        .run(dryrun || config.dryrun, force)
        .await
        .with_context(|| format!("updating {}", config.hostname))?;
    Ok(())
}

async fn cmd_status(config: Config, json: bool) -> anyhow::Result<()> {
    let updater = Updater::from_config(&config)?;
    let status = updater.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("gddns Status");
    println!("============\n");
    println!("Hostname:    {}", status.hostname);
    match status.current_ip {
        Some(ip) => println!("Current IP:  {}", ip),
        None => println!("Current IP:  (none for {:?})", status.family),
    }
    match (&status.record_ip, &status.record_error) {
        (Some(ip), _) => println!("DNS record:  {}", ip),
        (None, Some(e)) => println!("DNS record:  error: {}", e),
        (None, None) => println!("DNS record:  (no record)"),
    }
    println!(
        "Up to date:  {}",
        if status.up_to_date { "yes" } else { "no" }
    );

    Ok(())
}

async fn cmd_daemon(config: Config, interval: u64, dryrun: bool) -> anyhow::Result<()> {
    let updater = Updater::from_config(&config)?;
    let interval = Duration::from_secs(interval);
    let dryrun = dryrun || config.dryrun;

    tracing::info!(
        "Starting gddns daemon for {} (interval: {}s)",
        config.hostname,
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        match updater.run(dryrun, false).await {
            Ok(Outcome::Updated(result)) => {
                tracing::debug!("{} accepted update at {}", result.provider, result.timestamp);
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Update of {} failed: {}", config.hostname, e),
        }
    }
}

async fn cmd_validate(config: Config) -> anyhow::Result<()> {
    let updater = Updater::from_config(&config)?;
    let provider = updater.provider();

    match provider.validate().await {
        Ok(()) => {
            println!("{} ({}): OK", provider.name(), provider.domain());
            Ok(())
        }
        Err(e) => {
            println!("{} ({}): FAILED - {}", provider.name(), provider.domain(), e);
            std::process::exit(1);
        }
    }
}
