use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use slotwatch_browser::CdpBridge;
use slotwatch_core::{Config, Journal, Paths};
use slotwatch_engine::{HttpFormPoster, PollScheduler, RunOutcome};
use slotwatch_notify::{channel_status, NotifyHub};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "slotwatch")]
#[command(
    about = "Polls a booking portal for an earlier appointment slot and claims the first match",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Base directory for config and logs (default: ~/.slotwatch)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the polling engine
    Run,

    /// Write a default configuration file
    Onboard {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let paths = cli
        .base_dir
        .map(Paths::with_base)
        .unwrap_or_default();

    match cli.command {
        Commands::Onboard { force } => onboard(&paths, force),
        Commands::Status => status(&paths),
        Commands::Run => run(&paths).await,
    }
}

fn onboard(paths: &Paths, force: bool) -> anyhow::Result<()> {
    paths.ensure_dirs()?;
    let config_path = paths.config_file();
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    Config::default().save(&config_path)?;
    println!("Wrote {}", config_path.display());
    println!("Fill in account, portal and window before running.");
    Ok(())
}

fn status(paths: &Paths) -> anyhow::Result<()> {
    let config = Config::load_or_default(paths)?;
    let set = |value: &str| if value.is_empty() { "not set" } else { "set" };

    println!("config: {}", paths.config_file().display());
    println!("account.email:      {}", set(&config.account.email));
    println!("account.password:   {}", set(&config.account.password));
    println!("account.scheduleId: {}", set(&config.account.schedule_id));
    println!("portal.embassy:     {}", set(&config.portal.embassy));
    println!("portal.facilityId:  {}", set(&config.portal.facility_id));
    match config.target_window() {
        Ok(window) => println!("window:             {} .. {}", window.start, window.end),
        Err(_) => println!("window:             not set"),
    }
    for (channel, configured) in channel_status(&config.notify) {
        println!(
            "notify.{:<12} {}",
            format!("{}:", channel),
            if configured { "configured" } else { "-" }
        );
    }
    Ok(())
}

async fn run(paths: &Paths) -> anyhow::Result<()> {
    paths.ensure_dirs()?;
    let config = Config::load_or_default(paths)?;
    config
        .validate()
        .context("configuration incomplete, run `slotwatch onboard` and edit the config")?;
    let config = Arc::new(config);

    let bridge = Arc::new(
        CdpBridge::start(&config.browser, &paths.browser_data_dir())
            .await
            .context("failed to start the browser")?,
    );
    let notifier = Arc::new(NotifyHub::new(config.notify.clone()));
    let poster = Arc::new(HttpFormPoster::new());
    let journal = Journal::new(paths.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let mut scheduler =
        PollScheduler::new(bridge, poster, notifier, journal, config, shutdown_rx);

    match scheduler.run().await {
        RunOutcome::Claimed(result) if result.is_success() => {
            info!("{}", result.summary());
            Ok(())
        }
        RunOutcome::Claimed(result) => bail!("{}", result.summary()),
        RunOutcome::Aborted(reason) => bail!("run aborted: {}", reason),
        RunOutcome::Interrupted => {
            info!("Stopped by shutdown signal");
            Ok(())
        }
    }
}
