use crate::{
    error::Result,
    model::{self, WeatherReading},
    provider::WeatherProvider,
    schedule::{RetryPolicy, run_with_retry},
    store::Store,
};

/// The one city this pipeline records.
pub const CITY: &str = "Amsterdam";

/// What the inserter decided to do with the handed-over reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written; carries the assigned id.
    Inserted(i64),
    /// A row with the same timestamp already existed.
    SkippedDuplicate,
    /// Upstream produced nothing; nothing was written.
    NoData,
}

/// Stage 1: make sure the destination table exists.
pub fn init_stage(store: &Store) -> Result<()> {
    store.ensure_schema()?;
    log::info!("Table weather_data is ready.");
    Ok(())
}

/// Stage 2: fetch the current weather and stamp it with wall-clock time.
///
/// The timestamp is ours, not the provider's, because it marks when the
/// reading was fetched and doubles as the dedup key downstream.
pub async fn fetch_stage(provider: &dyn WeatherProvider) -> Result<WeatherReading> {
    let obs = provider.current_weather(CITY).await?;
    let timestamp = model::current_timestamp();

    log::info!(
        "Current weather in {CITY}: {}ºC, {} at {timestamp}",
        obs.temperature,
        obs.description
    );

    Ok(WeatherReading::new(timestamp, obs.temperature, obs.description))
}

/// Stage 3: insert the reading unless its timestamp is already stored.
///
/// The existence check and the insert are two separate statements, not a
/// transaction. Two overlapping runs could both pass the check; at a
/// daily cadence that window is accepted.
pub fn insert_stage(store: &Store, reading: Option<WeatherReading>) -> Result<InsertOutcome> {
    let Some(reading) = reading else {
        log::warn!("No weather data to insert.");
        return Ok(InsertOutcome::NoData);
    };

    if store.count_for_timestamp(&reading.timestamp)? == 0 {
        let id = store.insert_reading(&reading)?;
        log::info!("Weather data inserted into database.");
        Ok(InsertOutcome::Inserted(id))
    } else {
        log::info!("Duplicate timestamp. Skipping insert.");
        Ok(InsertOutcome::SkippedDuplicate)
    }
}

/// One full run: `Init → Fetch → Insert → Done`, strictly linear.
///
/// Each stage runs under the retry policy; a stage that exhausts its
/// attempts aborts the remaining stages. There is no rollback, the next
/// scheduled run simply starts again from Init.
pub async fn run_once(
    provider: &dyn WeatherProvider,
    store: &Store,
    policy: &RetryPolicy,
) -> Result<InsertOutcome> {
    run_with_retry(policy, "create_table", || async { init_stage(store) }).await?;

    let reading = run_with_retry(policy, "fetch_weather_data", || fetch_stage(provider)).await?;

    run_with_retry(policy, "append_to_database", || {
        let reading = reading.clone();
        async move { insert_stage(store, Some(reading)) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use crate::provider::Observation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Always answers with the same observation.
    #[derive(Debug)]
    struct ScriptedProvider {
        temperature: f64,
        description: &'static str,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(temperature: f64, description: &'static str) -> Self {
            Self {
                temperature,
                description,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn current_weather(&self, city: &str) -> Result<Observation> {
            assert_eq!(city, CITY);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Observation {
                temperature: self.temperature,
                description: self.description.to_string(),
            })
        }
    }

    /// Always fails like a provider that got a 404.
    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait]
    impl WeatherProvider for FailingProvider {
        async fn current_weather(&self, _city: &str) -> Result<Observation> {
            Err(WorkflowError::Api(
                "Failed to fetch weather data (404 Not Found): city not found".to_string(),
            ))
        }
    }

    fn test_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            retry_delay: Duration::from_secs(300),
            attempt_timeout: Duration::from_secs(600),
        }
    }

    #[tokio::test]
    async fn fetch_passes_provider_values_through() {
        let provider = ScriptedProvider::new(17.5, "broken clouds");
        let reading = fetch_stage(&provider).await.unwrap();

        assert_eq!(reading.temperature, 17.5);
        assert_eq!(reading.description, "broken clouds");
        assert_eq!(reading.id, None);
        chrono::DateTime::parse_from_rfc3339(&reading.timestamp).expect("stamp must be RFC 3339");
    }

    #[test]
    fn insert_without_data_writes_nothing() {
        let store = test_store();
        let outcome = insert_stage(&store, None).unwrap();

        assert_eq!(outcome, InsertOutcome::NoData);
        assert!(store.all_readings().unwrap().is_empty());
    }

    #[test]
    fn duplicate_timestamp_is_skipped() {
        let store = test_store();
        let reading =
            WeatherReading::new("2025-05-10T00:00:00Z".into(), 17.5, "broken clouds".into());

        let first = insert_stage(&store, Some(reading.clone())).unwrap();
        let second = insert_stage(&store, Some(reading)).unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::SkippedDuplicate);
        assert_eq!(store.all_readings().unwrap().len(), 1);
    }

    #[test]
    fn distinct_timestamps_both_insert() {
        let store = test_store();
        let a = WeatherReading::new("2025-05-10T00:00:00Z".into(), 17.5, "broken clouds".into());
        let b = WeatherReading::new("2025-05-11T00:00:00Z".into(), 12.1, "light rain".into());

        insert_stage(&store, Some(a)).unwrap();
        insert_stage(&store, Some(b)).unwrap();

        assert_eq!(store.all_readings().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_once_writes_exactly_one_row() {
        let provider = ScriptedProvider::new(17.5, "broken clouds");
        let store = test_store();

        let outcome = run_once(&provider, &store, &fast_policy()).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));

        let rows = store.all_readings().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].temperature, 17.5);
        assert_eq!(rows[0].description, "broken clouds");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    /// Block until the wall clock enters a new second, so the caller has
    /// nearly a full second in which back-to-back runs stamp the same
    /// timestamp.
    fn wait_for_fresh_second() {
        let start = model::current_timestamp();
        while model::current_timestamp() == start {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[tokio::test]
    async fn repeated_runs_dedup_by_timestamp() {
        let provider = ScriptedProvider::new(17.5, "broken clouds");
        let store = test_store();
        let policy = fast_policy();

        // Empty table: the first run writes exactly one row.
        let first = run_once(&provider, &store, &policy).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(store.all_readings().unwrap().len(), 1);

        // A fresh second guarantees the second run stamps a distinct
        // timestamp and leaves room for the third run to reuse it.
        wait_for_fresh_second();

        let second = run_once(&provider, &store, &policy).await.unwrap();
        let third = run_once(&provider, &store, &policy).await.unwrap();

        assert!(matches!(second, InsertOutcome::Inserted(_)));
        assert_eq!(third, InsertOutcome::SkippedDuplicate);

        let rows = store.all_readings().unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].timestamp, rows[1].timestamp);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_aborts_before_insert() {
        let store = test_store();

        let err = run_once(&FailingProvider, &store, &fast_policy())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("city not found"));
        assert!(store.all_readings().unwrap().is_empty());
    }
}
