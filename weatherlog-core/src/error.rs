/// Errors that are fatal to the current scheduled run.
///
/// None of these are recovered locally; they propagate out of the stage
/// that produced them and the retry policy treats them all the same.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing credential, unreadable settings file, or bad cron expression.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure, non-200 response, or unparseable body from the
    /// weather provider. Carries the provider's own message when one exists.
    #[error("weather API error: {0}")]
    Api(String),

    /// Connection, DDL, or DML failure against the SQLite database.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem failure while preparing the database location.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage attempt exceeded its per-attempt timeout.
    #[error("stage '{0}' timed out")]
    Timeout(&'static str),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
