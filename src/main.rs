use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sftp_mirror::{Config, Daemon, HealthCheck, ProcessRunner};

#[derive(Parser)]
#[command(name = "sftp-mirror")]
#[command(about = "Periodic SFTP directory mirroring agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging (overrides LOG_LEVEL)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the host key and mirror forever (default)
    Run,

    /// Register the host key and run a single mirror pass
    Once,

    /// System health check and diagnostics
    Doctor,

    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(None).await,
        Commands::Once => cmd_run(Some(1)).await,
        Commands::Doctor => cmd_doctor(),
        Commands::Config => cmd_config(),
    }
}

/// Initialize logging from `RUST_LOG`, then `LOG_LEVEL`, then the verbose flag
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        let level = Config::log_level_from_lookup(|key| std::env::var(key).ok());
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Log a startup failure and terminate with exit code 1
fn fatal(e: anyhow::Error) -> ! {
    error!("{:#}", e);
    std::process::exit(1);
}

/// Load configuration, run the startup sequence and enter the mirror loop
async fn cmd_run(max_cycles: Option<u64>) -> Result<()> {
    info!("Starting sftp-mirror v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().unwrap_or_else(|e| fatal(e));

    let mut daemon = Daemon::new(config, Arc::new(ProcessRunner::new()));
    if let Err(e) = daemon.prepare().await {
        fatal(e);
    }

    daemon.run_cycles(max_cycles).await?;

    if max_cycles.is_some() && daemon.stats().failed_syncs > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// System health check and diagnostics
fn cmd_doctor() -> Result<()> {
    let health = HealthCheck::run(&Config::from_env());
    print!("{}", health.report());

    if !health.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the effective configuration as YAML
fn cmd_config() -> Result<()> {
    let config = Config::from_env().unwrap_or_else(|e| fatal(e));
    print!("{}", config.to_redacted_yaml()?);
    Ok(())
}
