//! `wxcheck report` and `wxcheck stats`: read back the store.

use crate::cli::output;
use crate::config::{check_threshold, Config};
use crate::report::write_reports;
use crate::store::ObservationStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

fn open(config: &Config) -> Result<ObservationStore> {
    ObservationStore::open(&config.db_path)
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))
}

fn load(config_path: Option<&Path>, db: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(config_path).context("failed to load configuration")?;
    if let Some(db) = db {
        config.db_path = db;
    }
    Ok(config)
}

/// Write reports for stored rows above the threshold (all paired rows when unset).
pub fn run_report(
    config_path: Option<&Path>,
    threshold: Option<f64>,
    db: Option<PathBuf>,
    report_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load(config_path, db)?;
    check_threshold(threshold.unwrap_or(config.threshold))?;
    if let Some(dir) = report_dir {
        config.report_dir = dir;
    }
    let store = open(&config)?;

    let rows = match threshold {
        Some(t) => store.query(t)?,
        None => store.paired()?,
    };
    let stats = store.summary_statistics(threshold.unwrap_or(config.threshold))?;
    let paths = write_reports(&config.report_dir, &rows, &stats)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "rows": rows.len(),
            "statistics": stats,
            "csv": paths.csv.display().to_string(),
            "html": paths.html.display().to_string(),
        }));
    } else {
        println!("  {} rows written", rows.len());
        println!("  CSV report:  {}", paths.csv.display());
        println!("  HTML report: {}", paths.html.display());
    }
    Ok(())
}

/// Print statistics over every stored paired observation.
pub fn run_stats(config_path: Option<&Path>, threshold: Option<f64>, db: Option<PathBuf>) -> Result<()> {
    let config = load(config_path, db)?;
    let threshold = threshold.unwrap_or(config.threshold);
    check_threshold(threshold)?;
    let store = open(&config)?;
    let stats = store.summary_statistics(threshold)?;
    let total = store.count()?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "rows": total,
            "statistics": stats,
        }));
    } else {
        println!("  {total} stored observations");
        output::print_statistics(&stats);
    }
    Ok(())
}
