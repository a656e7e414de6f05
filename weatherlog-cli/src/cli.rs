use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::watch;
use weatherlog_core::{Config, OpenWeather, RetryPolicy, Store, run_once, schedule};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherlog", version, about = "Scheduled weather recorder")]
pub struct Cli {
    /// Path to a TOML settings file; platform default location when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database; overrides the settings file.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute one pipeline run immediately and exit.
    Run,

    /// Run the scheduler loop until Ctrl-C.
    Schedule,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let db_path = config.database_path(self.database.as_deref())?;

        match self.command {
            Command::Run => {
                let provider = OpenWeather::from_env()?;
                let store = Store::open(&db_path)?;
                let policy = RetryPolicy::from(config.retry);

                let outcome = run_once(&provider, &store, &policy).await?;
                log::info!("Run finished: {outcome:?}");
            }
            Command::Schedule => {
                let (shutdown_tx, shutdown_rx) = watch::channel(());

                tokio::spawn(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for Ctrl-C: {e}");
                    }
                    let _ = shutdown_tx.send(());
                });

                schedule::run_scheduler(&config, &db_path, shutdown_rx).await?;
            }
        }

        Ok(())
    }
}
