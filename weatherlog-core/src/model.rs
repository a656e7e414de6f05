use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One persisted weather reading.
///
/// `timestamp` is the dedup key: two rows never share the same value under
/// the normal daily cadence. It is compared as an exact string, which is why
/// it stays a `String` rather than a parsed `DateTime` on the way through
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Surrogate id assigned by SQLite on insert. `None` until stored.
    pub id: Option<i64>,
    /// RFC 3339 UTC timestamp stamped when the reading was fetched.
    pub timestamp: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Short human-readable condition, e.g. "broken clouds".
    pub description: String,
}

impl WeatherReading {
    pub fn new(timestamp: String, temperature: f64, description: String) -> Self {
        Self {
            id: None,
            timestamp,
            temperature,
            description,
        }
    }
}

/// Current wall-clock time as an RFC 3339 UTC string, seconds precision.
///
/// Seconds precision is ample at a daily cadence and keeps the stored
/// strings readable.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
