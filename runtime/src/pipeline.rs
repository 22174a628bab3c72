//! Batch orchestration: both sources, reconciliation, write-through.

use crate::api::ApiClient;
use crate::error::Result;
use crate::model::{BatchStatistics, PairedObservation};
use crate::reconcile::reconcile;
use crate::store::ObservationStore;
use crate::web::WebExtractor;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// How a batch turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every attempted city was paired.
    Complete,
    /// Some, not all, cities were paired.
    Partial,
    /// Nothing paired; usually a systemic fault such as a bad key or a site redesign.
    NoPairs,
}

impl RunOutcome {
    pub fn classify(paired: usize, attempted: usize) -> Self {
        if paired == 0 {
            RunOutcome::NoPairs
        } else if paired >= attempted {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub web_readings: usize,
    pub api_readings: usize,
    pub paired: usize,
    pub outcome: RunOutcome,
    pub observations: Vec<PairedObservation>,
    pub statistics: BatchStatistics,
}

/// Absolute deadline `budget` from now. A budget too large to represent
/// means no deadline.
pub fn deadline_from_now(budget: Option<Duration>) -> Option<Instant> {
    let budget = budget?;
    let deadline = Instant::now().checked_add(budget);
    if deadline.is_none() {
        warn!("batch deadline of {}s is out of range; running without one", budget.as_secs());
    }
    deadline
}

/// Run one batch over `cities`.
///
/// The web pass runs first, then the API pass, both sequential. Every
/// observation, partial ones included, is appended to `store`. Only a
/// browser acquisition failure or a store failure aborts the run.
pub async fn run_batch(
    cities: &[String],
    web: &mut WebExtractor,
    api: &ApiClient,
    store: &mut ObservationStore,
    threshold: f64,
    deadline: Option<Duration>,
) -> Result<BatchReport> {
    info!("batch starting: {} cities, threshold {threshold}°C", cities.len());

    let deadline = deadline_from_now(deadline);
    let web_readings = web.extract_batch(cities, deadline).await?;
    let api_readings = api.fetch_batch(cities).await;

    let reconciliation = reconcile(&web_readings, &api_readings, threshold, Utc::now());
    store.append_all(&reconciliation.observations)?;

    let paired = reconciliation.paired_count();
    let outcome = RunOutcome::classify(paired, cities.len());
    match outcome {
        RunOutcome::Complete => info!("batch complete: {paired}/{} cities paired", cities.len()),
        RunOutcome::Partial => warn!("batch partial: {paired}/{} cities paired", cities.len()),
        RunOutcome::NoPairs => error!(
            "batch produced no pairs out of {} cities; check the API key and page selectors",
            cities.len()
        ),
    }

    Ok(BatchReport {
        attempted: cities.len(),
        web_readings: web_readings.len(),
        api_readings: api_readings.len(),
        paired,
        outcome,
        observations: reconciliation.observations,
        statistics: reconciliation.statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_outcome() {
        assert_eq!(RunOutcome::classify(0, 5), RunOutcome::NoPairs);
        assert_eq!(RunOutcome::classify(0, 0), RunOutcome::NoPairs);
        assert_eq!(RunOutcome::classify(3, 5), RunOutcome::Partial);
        assert_eq!(RunOutcome::classify(5, 5), RunOutcome::Complete);
    }

    #[tokio::test]
    async fn test_deadline_from_now() {
        assert!(deadline_from_now(None).is_none());
        assert!(deadline_from_now(Some(Duration::from_secs(u64::MAX))).is_none());
        assert!(deadline_from_now(Some(Duration::MAX)).is_none());

        let d = deadline_from_now(Some(Duration::from_secs(60))).unwrap();
        assert!(d > Instant::now());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunOutcome::NoPairs).unwrap(),
            "\"no_pairs\""
        );
    }
}
