//! Configuration loading and resolution.
//!
//! Precedence: CLI flag > environment variable > JSON config file > defaults.

use crate::api::{ApiUnits, DEFAULT_API_URL};
use crate::error::{Result, WxError};
use crate::retry::RetryPolicy;
use crate::web::resolve::DEFAULT_CITY_SLUGS;
use crate::web::strategy::DEFAULT_TEMPERATURE_SELECTORS;
use crate::web::WebSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default weather page base.
pub const DEFAULT_WEB_URL: &str = "https://www.timeanddate.com/weather/";

/// Everything the batch run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub api_units: ApiUnits,
    pub api_timeout_secs: u64,
    pub web_base_url: String,
    pub cities: Vec<String>,
    /// City → country path segment on the weather site.
    pub city_slugs: BTreeMap<String, String>,
    /// Primary temperature selectors, tried in order.
    pub temperature_selectors: Vec<String>,
    /// Discrepancy threshold in Celsius.
    pub threshold: f64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub inter_city_delay_secs: u64,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub report_dir: PathBuf,
    /// Wall-clock budget for the web pass; remaining cities are abandoned.
    pub batch_deadline_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: DEFAULT_API_URL.to_string(),
            api_units: ApiUnits::Metric,
            api_timeout_secs: 30,
            web_base_url: DEFAULT_WEB_URL.to_string(),
            cities: DEFAULT_CITY_SLUGS
                .iter()
                .map(|(city, _)| city.to_string())
                .collect(),
            city_slugs: DEFAULT_CITY_SLUGS
                .iter()
                .map(|(city, slug)| (city.to_string(), slug.to_string()))
                .collect(),
            temperature_selectors: DEFAULT_TEMPERATURE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            threshold: 2.0,
            max_retries: 3,
            retry_delay_secs: 5,
            inter_city_delay_secs: 3,
            navigation_timeout_secs: 60,
            selector_timeout_secs: 30,
            headless: true,
            chromium_path: None,
            db_path: data_dir().join("observations.db"),
            report_dir: data_dir().join("reports"),
            batch_deadline_secs: None,
        }
    }
}

/// `~/.wxcheck`.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wxcheck")
}

/// Resolve the config file path: explicit, then `WXCHECK_CONFIG`, then
/// `./wxcheck.json`, then `~/.wxcheck/config.json` if it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("WXCHECK_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd = PathBuf::from("wxcheck.json");
    if cwd.exists() {
        return Some(cwd);
    }

    let home = data_dir().join("config.json");
    home.exists().then_some(home)
}

/// A discrepancy threshold must be a finite, non-negative Celsius value.
pub fn check_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(WxError::Config(format!(
            "threshold must be a non-negative number, got {threshold}"
        )));
    }
    Ok(())
}

impl Config {
    /// Parse a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WxError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| WxError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Defaults, overlaid with the resolved config file, then the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(key) = ["WXCHECK_API_KEY", "OPENWEATHER_API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        {
            self.api_key = key;
        }
        if let Ok(db) = std::env::var("WXCHECK_DB") {
            self.db_path = PathBuf::from(db);
        }
        if let Ok(chromium) = std::env::var("WXCHECK_CHROMIUM_PATH") {
            self.chromium_path = Some(PathBuf::from(chromium));
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_threshold(self.threshold)?;
        if self.max_retries == 0 {
            return Err(WxError::Config("max_retries must be at least 1".to_string()));
        }
        if self.cities.is_empty() {
            return Err(WxError::Config("city list is empty".to_string()));
        }
        if self.temperature_selectors.is_empty() {
            return Err(WxError::Config("temperature_selectors is empty".to_string()));
        }
        Ok(())
    }

    pub fn web_settings(&self) -> WebSettings {
        WebSettings {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(self.selector_timeout_secs),
            inter_city_delay: Duration::from_secs(self.inter_city_delay_secs),
            retry: RetryPolicy::new(self.max_retries, Duration::from_secs(self.retry_delay_secs)),
            ..WebSettings::default()
        }
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs)
    }
}
