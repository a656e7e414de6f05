use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;

use crate::{
    config::{Config, RetryConfig},
    error::{Result, WorkflowError},
    pipeline::{self, InsertOutcome},
    provider::openweather::OpenWeather,
    store::Store,
};

/// Retry numbers applied uniformly to every stage.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per stage, including the first.
    pub max_attempts: u32,
    /// Spacing between attempts.
    pub retry_delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetryConfig::default())
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(cfg: RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            retry_delay: Duration::from_secs(cfg.retry_delay_secs),
            attempt_timeout: Duration::from_secs(cfg.attempt_timeout_secs),
        }
    }
}

/// Run one stage under the retry policy.
///
/// Each attempt is bounded by the per-attempt timeout; a timed-out attempt
/// counts as a failed one. Attempts are spaced by the retry delay and the
/// last error is the one that propagates. The policy does not distinguish
/// error kinds.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    stage: &'static str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt_no = 0;

    loop {
        attempt_no += 1;

        let outcome = match tokio::time::timeout(policy.attempt_timeout, attempt()).await {
            Ok(res) => res,
            Err(_) => Err(WorkflowError::Timeout(stage)),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if attempt_no < max => {
                log::warn!("[{stage}] attempt {attempt_no}/{max} failed: {e}");
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => {
                log::error!("[{stage}] giving up after {attempt_no} attempt(s): {e}");
                return Err(e);
            }
        }
    }
}

/// Normalise a cron expression to the 6-field form the `cron` crate wants.
///
/// Standard cron has 5 fields (min hr dom month dow); the crate expects a
/// leading seconds field. A 5-field expression gets "0 " prepended to pin
/// seconds to zero.
fn normalize_cron_expr(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Compute the next occurrence of `cron_expr` strictly after `after`.
pub fn next_occurrence(cron_expr: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let expr = normalize_cron_expr(cron_expr);

    let schedule = cron::Schedule::from_str(&expr)
        .map_err(|e| WorkflowError::Config(format!("invalid cron expression '{cron_expr}': {e}")))?;

    schedule.after(&after).next().ok_or_else(|| {
        WorkflowError::Config(format!("cron expression '{cron_expr}' has no next occurrence"))
    })
}

/// Run the scheduler loop until the shutdown signal fires.
///
/// Each tick executes one full pipeline run against a freshly opened
/// store. Missed occurrences are not caught up: the next occurrence is
/// always computed from "now" after the previous run finishes. A failed
/// run is logged and the loop keeps going.
pub async fn run_scheduler(
    config: &Config,
    db_path: &Path,
    mut shutdown: watch::Receiver<()>,
) -> Result<()> {
    let policy = RetryPolicy::from(config.retry);
    let expr = config.schedule_expr();

    // Validate the expression up front rather than on the first tick.
    next_occurrence(expr, Utc::now())?;

    log::info!(
        "[scheduler] starting: schedule '{expr}', database {}",
        db_path.display()
    );

    loop {
        let next = next_occurrence(expr, Utc::now())?;
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        log::info!("[scheduler] next run at {next}");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                log::info!("[scheduler] shutdown signal received, exiting");
                return Ok(());
            }
        }

        match run_scheduled(db_path, &policy).await {
            Ok(outcome) => log::info!("[scheduler] run finished: {outcome:?}"),
            Err(e) => log::error!("[scheduler] run failed: {e}"),
        }
    }
}

/// One scheduled run: resolve the credential, open the store, run the
/// pipeline. The credential check happens before any network activity.
async fn run_scheduled(db_path: &Path, policy: &RetryPolicy) -> Result<InsertOutcome> {
    let provider = OpenWeather::from_env()?;
    let store = Store::open(db_path)?;
    pipeline::run_once(&provider, &store, policy).await
}
