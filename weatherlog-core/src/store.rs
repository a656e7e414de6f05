use rusqlite::{Connection, params};
use std::path::Path;

use crate::{error::Result, model::WeatherReading};

/// SQLite-backed store for weather readings.
///
/// Opening a connection and creating the table are separate operations:
/// the schema initializer is its own pipeline stage and runs explicitly
/// at the start of every scheduled run.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at the given path.
    ///
    /// Creates parent directories as needed and enables WAL journaling.
    /// Does NOT create the table; see [`Store::ensure_schema`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self { conn })
    }

    /// In-memory database, test and inspection use.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the `weather_data` table if it does not exist; no-op otherwise.
    ///
    /// `timestamp` deliberately carries no UNIQUE constraint: dedup is a
    /// check at insert time, not a schema rule.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS weather_data (
                id          INTEGER PRIMARY KEY,
                timestamp   TEXT NOT NULL,
                temperature REAL NOT NULL,
                description TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Number of rows already stored for an exact timestamp string.
    pub fn count_for_timestamp(&self, timestamp: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM weather_data WHERE timestamp = ?1",
            params![timestamp],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Insert a reading and return the id SQLite assigned to it.
    pub fn insert_reading(&self, reading: &WeatherReading) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO weather_data (timestamp, temperature, description)
             VALUES (?1, ?2, ?3)",
            params![reading.timestamp, reading.temperature, reading.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All stored readings, oldest first.
    pub fn all_readings(&self) -> Result<Vec<WeatherReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, temperature, description FROM weather_data ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WeatherReading {
                id: Some(row.get(0)?),
                timestamp: row.get(1)?,
                temperature: row.get(2)?,
                description: row.get(3)?,
            })
        })?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }
}
