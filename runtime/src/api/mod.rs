//! Weather API client.
//!
//! One GET per city, no retries. A failed city is simply absent from the
//! batch; the browser path is the one that carries a retry budget.

use crate::error::{Result, WxError};
use crate::model::{Reading, Source};
use crate::normalize::{self, TemperatureUnit};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Unit system requested from the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiUnits {
    #[default]
    Metric,
    Imperial,
    /// Kelvin.
    Standard,
}

impl ApiUnits {
    pub fn as_param(self) -> &'static str {
        match self {
            ApiUnits::Metric => "metric",
            ApiUnits::Imperial => "imperial",
            ApiUnits::Standard => "standard",
        }
    }

    pub fn temperature_unit(self) -> TemperatureUnit {
        match self {
            ApiUnits::Metric => TemperatureUnit::Celsius,
            ApiUnits::Imperial => TemperatureUnit::Fahrenheit,
            ApiUnits::Standard => TemperatureUnit::Kelvin,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: Option<String>,
    main: Option<MainBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    feels_like: Option<f64>,
}

/// HTTP client for the JSON weather API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    units: ApiUnits,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, units: ApiUnits, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wxcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WxError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            units,
            retry: RetryPolicy::none(),
        })
    }

    /// Fetch one city; any failure is logged and yields `None`.
    pub async fn fetch(&self, city: &str) -> Option<Reading> {
        let label = format!("api {city}");
        let result = self
            .retry
            .run(&label, WxError::is_retryable, |_| self.try_fetch(city))
            .await;
        match result {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("{city}: {e}");
                None
            }
        }
    }

    /// Fetch one city, reporting why it failed.
    pub async fn try_fetch(&self, city: &str) -> Result<Reading> {
        let failed = |reason: String| WxError::ApiRequestFailed {
            city: city.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_param()),
            ])
            .send()
            .await
            .map_err(|e| failed(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        let body: WeatherResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("malformed body: {e}")))?;

        let main = body.main.ok_or_else(|| failed("missing `main`".to_string()))?;
        let raw_temp = main
            .temp
            .ok_or_else(|| failed("missing `main.temp`".to_string()))?;

        let unit = self.units.temperature_unit();
        let temperature = normalize::from_value(raw_temp, unit)
            .map_err(|e| failed(e.to_string()))?;
        let feels_like = main.feels_like.and_then(|v| match normalize::from_value(v, unit) {
            Ok(c) => Some(c),
            Err(e) => {
                debug!("{city}: dropping feels_like: {e}");
                None
            }
        });

        if let Some(name) = body.name.as_deref() {
            if !name.eq_ignore_ascii_case(city.trim()) {
                debug!("{city}: API resolved to {name:?}");
            }
        }

        Ok(Reading::new(city, temperature, feels_like, Source::Api))
    }

    /// Fetch cities sequentially, preserving order and omitting failures.
    pub async fn fetch_batch(&self, cities: &[String]) -> Vec<Reading> {
        let mut readings = Vec::with_capacity(cities.len());
        for city in cities {
            if let Some(reading) = self.fetch(city).await {
                debug!(
                    "{city}: {:?}°C (feels like {:?}°C) from api",
                    reading.temperature_celsius, reading.feels_like_celsius
                );
                readings.push(reading);
            }
        }
        info!(
            "api batch complete: {}/{} cities fetched",
            readings.len(),
            cities.len()
        );
        readings
    }
}
