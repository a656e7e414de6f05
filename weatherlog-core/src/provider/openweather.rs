use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config,
    error::{Result, WorkflowError},
    provider::{Observation, WeatherProvider},
};

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// OpenWeatherMap current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeather {
    api_key: String,
    http: Client,
}

impl OpenWeather {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: Client::new(),
        }
    }

    /// Construct from the `OPENWEATHER_API_KEY` environment variable.
    ///
    /// Fails with a configuration error before anything touches the
    /// network when the variable is absent.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(config::api_key_from_env()?))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeather {
    async fn current_weather(&self, city: &str) -> Result<Observation> {
        let res = self
            .http
            .get(CURRENT_WEATHER_URL)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| WorkflowError::Api(format!("Failed to send request: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WorkflowError::Api(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(WorkflowError::Api(format!(
                "Failed to fetch weather data ({status}): {}",
                error_message(&body),
            )));
        }

        parse_observation(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
}

/// OpenWeatherMap error bodies look like `{"cod": "404", "message": "..."}`.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

/// Parse a 200 body into an observation. Pure, so tests run on fixture
/// bodies without a server.
fn parse_observation(body: &str) -> Result<Observation> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| WorkflowError::Api(format!("Failed to parse weather JSON: {e}")))?;

    let description = parsed
        .weather
        .first()
        .map(|w| w.description.clone())
        .ok_or_else(|| {
            WorkflowError::Api("Weather response contained no condition entries".to_string())
        })?;

    Ok(Observation {
        temperature: parsed.main.temp,
        description,
    })
}

/// Extract the provider's `message` from an error body, falling back to
/// the (truncated) raw body when none parses.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<OwErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
