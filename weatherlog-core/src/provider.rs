use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// A raw observation as reported by the provider, before the pipeline
/// stamps its own wall-clock timestamp on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Condition text, e.g. "light rain".
    pub description: String,
}

/// Abstraction over the weather HTTP API.
///
/// The pipeline only ever talks to this trait, so tests can swap in a
/// scripted provider and run without the network.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current weather for a city by name.
    async fn current_weather(&self, city: &str) -> Result<Observation>;
}
