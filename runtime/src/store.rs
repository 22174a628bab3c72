//! Observation store: append-only SQLite persistence of paired observations.
//!
//! Rows are never updated or deleted here; a correction is a new row.

use crate::error::Result;
use crate::model::{BatchStatistics, PairedObservation};
use crate::reconcile::statistics_from_discrepancies;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city TEXT NOT NULL,
    temperature_web REAL,
    feels_like_web REAL,
    temperature_api REAL,
    feels_like_api REAL,
    avg_temperature REAL,
    discrepancy REAL,
    observed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_observations_discrepancy ON observations (discrepancy);";

const COLUMNS: &str = "city, temperature_web, feels_like_web, temperature_api, feels_like_api, \
                       avg_temperature, discrepancy, observed_at";

/// SQLite-backed store of paired observations.
pub struct ObservationStore {
    db: Connection,
}

impl ObservationStore {
    /// Open or create a store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        Self::init(db)
    }

    /// A throwaway store that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Default location, `~/.wxcheck/observations.db`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".wxcheck")
            .join("observations.db")
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Append one observation and return its row id.
    pub fn append(&self, obs: &PairedObservation) -> Result<i64> {
        let id = insert_row(&self.db, obs)?;
        debug!("stored observation #{id} for {}", obs.city);
        Ok(id)
    }

    /// Append many observations in one transaction.
    pub fn append_all(&mut self, observations: &[PairedObservation]) -> Result<usize> {
        let tx = self.db.transaction()?;
        for obs in observations {
            insert_row(&tx, obs)?;
        }
        tx.commit()?;
        debug!("stored {} observations", observations.len());
        Ok(observations.len())
    }

    /// Paired observations with discrepancy strictly above `threshold`,
    /// largest first.
    pub fn query(&self, threshold: f64) -> Result<Vec<PairedObservation>> {
        self.select_paired(Some(threshold))
    }

    /// Every paired observation, largest discrepancy first.
    pub fn paired(&self) -> Result<Vec<PairedObservation>> {
        self.select_paired(None)
    }

    fn select_paired(&self, threshold: Option<f64>) -> Result<Vec<PairedObservation>> {
        let filter = if threshold.is_some() {
            "AND discrepancy > ?1"
        } else {
            ""
        };
        let mut stmt = self.db.prepare(&format!(
            "SELECT {COLUMNS} FROM observations
             WHERE discrepancy IS NOT NULL {filter}
             ORDER BY discrepancy DESC, id ASC"
        ))?;
        let rows = match threshold {
            Some(t) => stmt.query_map(params![t], row_to_observation)?,
            None => stmt.query_map([], row_to_observation)?,
        }
        .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every row, partial ones included, in insertion order.
    pub fn all(&self) -> Result<Vec<PairedObservation>> {
        let mut stmt = self
            .db
            .prepare(&format!("SELECT {COLUMNS} FROM observations ORDER BY id ASC"))?;
        let rows = stmt
            .query_map([], row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Statistics over every paired row ever stored.
    pub fn summary_statistics(&self, threshold: f64) -> Result<BatchStatistics> {
        let mut stmt = self
            .db
            .prepare("SELECT discrepancy FROM observations WHERE discrepancy IS NOT NULL")?;
        let discrepancies = stmt
            .query_map([], |row| row.get::<_, f64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(statistics_from_discrepancies(&discrepancies, threshold))
    }

    /// Total number of rows.
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn insert_row(db: &Connection, obs: &PairedObservation) -> rusqlite::Result<i64> {
    let mut stmt = db.prepare_cached(&format!(
        "INSERT INTO observations ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ))?;
    stmt.insert(params![
        obs.city,
        obs.temperature_web,
        obs.feels_like_web,
        obs.temperature_api,
        obs.feels_like_api,
        obs.avg_temperature,
        obs.discrepancy,
        obs.timestamp.to_rfc3339(),
    ])
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<PairedObservation> {
    let observed_at: String = row.get(7)?;
    let timestamp = DateTime::parse_from_rfc3339(&observed_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(PairedObservation {
        city: row.get(0)?,
        temperature_web: row.get(1)?,
        feels_like_web: row.get(2)?,
        temperature_api: row.get(3)?,
        feels_like_api: row.get(4)?,
        avg_temperature: row.get(5)?,
        discrepancy: row.get(6)?,
        timestamp,
    })
}
