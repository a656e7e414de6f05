use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Result, WorkflowError};

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

/// Top-level settings stored on disk.
///
/// Example TOML:
///
/// ```toml
/// database = "/var/lib/weatherlog/weatherlog.db"
/// schedule = "0 0 * * *"
///
/// [retry]
/// max_attempts = 3
/// retry_delay_secs = 300
/// attempt_timeout_secs = 600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to the SQLite database file. Falls back to the platform data
    /// directory when unset.
    pub database: Option<PathBuf>,

    /// Cron expression for the scheduler, standard 5-field form.
    #[serde(default = "default_schedule")]
    pub schedule: Option<String>,

    /// Per-stage retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry numbers applied uniformly to every stage, whatever the error kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per stage, including the first.
    pub max_attempts: u32,
    /// Spacing between attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Upper bound on a single attempt, in seconds.
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 5 * 60,
            attempt_timeout_secs: 10 * 60,
        }
    }
}

fn default_schedule() -> Option<String> {
    Some(Config::DEFAULT_SCHEDULE.to_string())
}

impl Config {
    /// Daily at midnight.
    pub const DEFAULT_SCHEDULE: &'static str = "0 0 * * *";

    /// Load settings from `path` if given, otherwise from the platform
    /// config directory. A missing default file yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(WorkflowError::Config(format!(
                        "Settings file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let p = Self::config_file_path()?;
                if !p.exists() {
                    // First run: no settings file yet.
                    return Ok(Self::with_defaults());
                }
                p
            }
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            WorkflowError::Config(format!("Failed to read settings file {}: {e}", path.display()))
        })?;

        let cfg: Config = toml::from_str(&contents).map_err(|e| {
            WorkflowError::Config(format!(
                "Failed to parse settings file {}: {e}",
                path.display()
            ))
        })?;

        Ok(cfg)
    }

    fn with_defaults() -> Self {
        Self {
            schedule: default_schedule(),
            ..Self::default()
        }
    }

    /// Cron expression to schedule runs by, defaulting to daily.
    pub fn schedule_expr(&self) -> &str {
        self.schedule.as_deref().unwrap_or(Self::DEFAULT_SCHEDULE)
    }

    /// Resolve the database path: CLI override, then settings file, then the
    /// platform data directory.
    pub fn database_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = cli_override {
            return Ok(p.to_path_buf());
        }
        if let Some(p) = &self.database {
            return Ok(p.clone());
        }

        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("weatherlog.db"))
    }

    /// Path to the settings file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weatherlog", "weatherlog").ok_or_else(|| {
        WorkflowError::Config("Could not determine platform config directory".to_string())
    })
}

/// Read the API credential from the process environment.
///
/// The fetch stage calls this before constructing an HTTP client, so a
/// missing key fails the run without any network activity.
pub fn api_key_from_env() -> Result<String> {
    std::env::var(API_KEY_VAR).map_err(|_| {
        WorkflowError::Config(format!(
            "{API_KEY_VAR} is not set. Please check environment variables."
        ))
    })
}
