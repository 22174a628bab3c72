//! Core data model: readings, paired observations and batch statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which independent source produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Web,
    Api,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Web => f.write_str("web"),
            Source::Api => f.write_str("api"),
        }
    }
}

/// One source's temperature observation for one city.
///
/// Values are Celsius, rounded to one decimal and inside the plausible
/// bound; a reading is only constructed after normalisation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city: String,
    pub temperature_celsius: Option<f64>,
    pub feels_like_celsius: Option<f64>,
    pub source: Source,
}

impl Reading {
    pub fn new(
        city: impl Into<String>,
        temperature_celsius: f64,
        feels_like_celsius: Option<f64>,
        source: Source,
    ) -> Self {
        Self {
            city: city.into(),
            temperature_celsius: Some(temperature_celsius),
            feels_like_celsius,
            source,
        }
    }
}

/// The joined web and API reading for one city within one batch.
///
/// A partial observation has one side absent; its `avg_temperature` and
/// `discrepancy` are then absent too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedObservation {
    pub city: String,
    pub temperature_web: Option<f64>,
    pub feels_like_web: Option<f64>,
    pub temperature_api: Option<f64>,
    pub feels_like_api: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub discrepancy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PairedObservation {
    /// Both temperatures are present.
    pub fn is_paired(&self) -> bool {
        self.discrepancy.is_some()
    }

    /// Feels-like difference, when both sides reported one.
    pub fn feels_like_discrepancy(&self) -> Option<f64> {
        match (self.feels_like_web, self.feels_like_api) {
            (Some(w), Some(a)) => Some(crate::normalize::round1((w - a).abs())),
            _ => None,
        }
    }

    /// Strictly greater than the threshold.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.discrepancy.is_some_and(|d| d > threshold)
    }
}

/// Aggregates over the discrepancies of fully paired observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub mean_discrepancy: f64,
    pub max_discrepancy: f64,
    pub min_discrepancy: f64,
    pub cities_exceeding_threshold: usize,
    pub threshold: f64,
}

impl BatchStatistics {
    /// Statistics for an empty set: every aggregate is zero.
    pub fn empty(threshold: f64) -> Self {
        Self {
            mean_discrepancy: 0.0,
            max_discrepancy: 0.0,
            min_discrepancy: 0.0,
            cities_exceeding_threshold: 0,
            threshold,
        }
    }
}
