//! Temperature normalisation: free-form text or raw values to Celsius.
//!
//! Every value leaving this module is rounded to one decimal place and lies
//! within the plausible bound. Both sources pass through here so that
//! discrepancies are compared at the same granularity.

use crate::error::{Result, WxError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Lowest physically plausible surface temperature in Celsius.
pub const PLAUSIBLE_MIN_C: f64 = -90.0;

/// Highest physically plausible surface temperature in Celsius.
pub const PLAUSIBLE_MAX_C: f64 = 60.0;

/// Unit a raw temperature is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    /// Convert a value in this unit to Celsius, unrounded.
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            TemperatureUnit::Kelvin => value - 273.15,
        }
    }
}

/// A numeric token and the unit marker directly after it, if any.
fn reading_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d+(?:\.\d+)?)\s*(°\s*[CcFf]|℃|℉)?").expect("static regex")
    })
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn marker_unit(marker: &str) -> Option<TemperatureUnit> {
    match marker.chars().last()? {
        'F' | 'f' | '℉' => Some(TemperatureUnit::Fahrenheit),
        'C' | 'c' | '℃' => Some(TemperatureUnit::Celsius),
        _ => None,
    }
}

/// Parse free-form text such as `"68°F"` or `"Feels Like: −3 °C"`.
///
/// Only the first numeric token is read. Its unit is the marker directly
/// after it; `declared` applies only when that token has no marker. Markers
/// attached to later figures are ignored.
pub fn parse_text(text: &str, declared: Option<TemperatureUnit>) -> Result<f64> {
    // timeanddate renders negatives with U+2212
    let cleaned = text.replace('\u{2212}', "-");

    let caps = reading_token()
        .captures(&cleaned)
        .ok_or_else(|| WxError::ExtractionFailure(format!("no numeric token in {text:?}")))?;

    let number = &caps[1];
    let value: f64 = number
        .parse()
        .map_err(|_| WxError::ExtractionFailure(format!("bad number {number:?}")))?;

    let unit = caps
        .get(2)
        .and_then(|m| marker_unit(m.as_str()))
        .or(declared)
        .ok_or_else(|| WxError::ExtractionFailure(format!("no unit marker after {number} in {text:?}")))?;

    from_value(value, unit)
}

/// Normalise a numeric value in the given unit.
pub fn from_value(value: f64, unit: TemperatureUnit) -> Result<f64> {
    if !value.is_finite() {
        return Err(WxError::ExtractionFailure(format!("non-finite value {value}")));
    }
    let celsius = round1(unit.to_celsius(value));
    check_plausible(celsius)
}

/// Reject values outside the plausible bound.
pub fn check_plausible(celsius: f64) -> Result<f64> {
    if (PLAUSIBLE_MIN_C..=PLAUSIBLE_MAX_C).contains(&celsius) {
        Ok(celsius)
    } else {
        Err(WxError::ExtractionFailure(format!(
            "{celsius}°C outside plausible range [{PLAUSIBLE_MIN_C}, {PLAUSIBLE_MAX_C}]"
        )))
    }
}
