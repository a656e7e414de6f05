//! Core library for the `weatherlog` pipeline.
//!
//! This crate defines:
//! - Configuration, settings file, and credential handling
//! - Abstraction over the weather provider (OpenWeatherMap)
//! - SQLite storage for weather readings
//! - The three-stage workflow (init table, fetch, deduplicating insert)
//! - The retry policy and the cron scheduler loop
//!
//! It is used by `weatherlog-cli`, but can also be reused by other binaries
//! or services.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod schedule;
pub mod store;

pub use config::{Config, RetryConfig};
pub use error::{Result, WorkflowError};
pub use model::WeatherReading;
pub use pipeline::{CITY, InsertOutcome, run_once};
pub use provider::{Observation, WeatherProvider, openweather::OpenWeather};
pub use schedule::{RetryPolicy, run_scheduler};
pub use store::Store;
