//! Reconciler: joins web and API readings per city and aggregates
//! discrepancy statistics.
//!
//! Pure: the same inputs (including the timestamp) always produce the same
//! output.

use crate::model::{BatchStatistics, PairedObservation, Reading};
use crate::normalize::round1;
use crate::web::resolve::city_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Output of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// One entry per city, in first-seen order (web batch first).
    pub observations: Vec<PairedObservation>,
    pub statistics: BatchStatistics,
}

impl Reconciliation {
    /// Number of fully paired observations.
    pub fn paired_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_paired()).count()
    }
}

struct Slot<'a> {
    city: &'a str,
    web: Option<&'a Reading>,
    api: Option<&'a Reading>,
}

/// Join two batches by case-normalised city name.
///
/// Cities seen in only one batch become partial observations and are left
/// out of the statistics. If a city repeats within one batch, the first
/// reading is kept.
pub fn reconcile(
    web: &[Reading],
    api: &[Reading],
    threshold: f64,
    timestamp: DateTime<Utc>,
) -> Reconciliation {
    let mut slots: Vec<Slot<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for reading in web {
        let key = city_key(&reading.city);
        if index.contains_key(&key) {
            continue;
        }
        index.insert(key, slots.len());
        slots.push(Slot {
            city: &reading.city,
            web: Some(reading),
            api: None,
        });
    }

    for reading in api {
        let key = city_key(&reading.city);
        match index.get(&key) {
            Some(&i) => {
                if slots[i].api.is_none() {
                    slots[i].api = Some(reading);
                }
            }
            None => {
                index.insert(key, slots.len());
                slots.push(Slot {
                    city: &reading.city,
                    web: None,
                    api: Some(reading),
                });
            }
        }
    }

    let observations: Vec<PairedObservation> = slots
        .into_iter()
        .map(|slot| pair(slot, timestamp))
        .collect();
    let statistics = compute_statistics(&observations, threshold);

    Reconciliation {
        observations,
        statistics,
    }
}

fn pair(slot: Slot<'_>, timestamp: DateTime<Utc>) -> PairedObservation {
    let temperature_web = slot.web.and_then(|r| r.temperature_celsius);
    let temperature_api = slot.api.and_then(|r| r.temperature_celsius);

    let (avg_temperature, discrepancy) = match (temperature_web, temperature_api) {
        (Some(w), Some(a)) => (Some(round1((w + a) / 2.0)), Some(round1((w - a).abs()))),
        _ => (None, None),
    };

    PairedObservation {
        city: slot.city.trim().to_string(),
        temperature_web,
        feels_like_web: slot.web.and_then(|r| r.feels_like_celsius),
        temperature_api,
        feels_like_api: slot.api.and_then(|r| r.feels_like_celsius),
        avg_temperature,
        discrepancy,
        timestamp,
    }
}

/// Statistics over the fully paired observations in `observations`.
pub fn compute_statistics(observations: &[PairedObservation], threshold: f64) -> BatchStatistics {
    let discrepancies: Vec<f64> = observations.iter().filter_map(|o| o.discrepancy).collect();
    statistics_from_discrepancies(&discrepancies, threshold)
}

/// Mean, max and min over `discrepancies`, plus the count strictly above
/// `threshold`. An empty slice yields zeros.
pub fn statistics_from_discrepancies(discrepancies: &[f64], threshold: f64) -> BatchStatistics {
    if discrepancies.is_empty() {
        return BatchStatistics::empty(threshold);
    }

    let sum: f64 = discrepancies.iter().sum();
    let max = discrepancies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = discrepancies.iter().copied().fold(f64::INFINITY, f64::min);

    BatchStatistics {
        mean_discrepancy: sum / discrepancies.len() as f64,
        max_discrepancy: max,
        min_discrepancy: min,
        cities_exceeding_threshold: discrepancies.iter().filter(|&&d| d > threshold).count(),
        threshold,
    }
}
