//! One full `wxcheck run` batch.

use crate::api::ApiClient;
use crate::cli::output;
use crate::config::Config;
use crate::pipeline::{run_batch, RunOutcome};
use crate::renderer::chromium::ChromiumLauncher;
use crate::report::write_reports;
use crate::store::ObservationStore;
use crate::web::resolve::CityResolver;
use crate::web::strategy::selector_chain;
use crate::web::WebExtractor;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Flags accepted by `wxcheck run`.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub threshold: Option<f64>,
    pub cities: Vec<String>,
    pub db: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub no_report: bool,
    pub headful: bool,
}

/// Apply CLI flags on top of the loaded configuration.
pub fn apply_args(config: &mut Config, args: &RunArgs) {
    if let Some(t) = args.threshold {
        config.threshold = t;
    }
    if !args.cities.is_empty() {
        config.cities = args.cities.clone();
    }
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &args.report_dir {
        config.report_dir = dir.clone();
    }
    if args.headful {
        config.headless = false;
    }
}

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = Config::load(config_path).context("failed to load configuration")?;
    apply_args(&mut config, &args);
    config.validate()?;
    if config.api_key.is_empty() {
        bail!("no API key configured. Set WXCHECK_API_KEY or `api_key` in the config file.");
    }

    let resolver = CityResolver::new(
        &config.web_base_url,
        config
            .city_slugs
            .iter()
            .map(|(city, slug)| (city.as_str(), slug.as_str())),
    )?;
    let chain = selector_chain(&config.temperature_selectors)?;
    let launcher = Arc::new(ChromiumLauncher {
        executable: config.chromium_path.clone(),
        headless: config.headless,
    });
    let mut web = WebExtractor::new(launcher, resolver, chain, config.web_settings());

    let api = ApiClient::new(
        &config.api_base_url,
        &config.api_key,
        config.api_units,
        Duration::from_secs(config.api_timeout_secs),
    )?;

    let mut store = ObservationStore::open(&config.db_path)
        .with_context(|| format!("failed to open store at {}", config.db_path.display()))?;

    let report = run_batch(
        &config.cities,
        &mut web,
        &api,
        &mut store,
        config.threshold,
        config.batch_deadline(),
    )
    .await?;

    let paths = if args.no_report {
        None
    } else {
        Some(write_reports(
            &config.report_dir,
            &report.observations,
            &report.statistics,
        )?)
    };

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "report": report,
            "csv": paths.as_ref().map(|p| p.csv.display().to_string()),
            "html": paths.as_ref().map(|p| p.html.display().to_string()),
        }));
    } else {
        println!(
            "  Paired {}/{} cities (web {}, api {})",
            report.paired, report.attempted, report.web_readings, report.api_readings
        );
        output::print_statistics(&report.statistics);
        if let Some(p) = &paths {
            println!("  CSV report:  {}", p.csv.display());
            println!("  HTML report: {}", p.html.display());
        }
    }

    if report.outcome == RunOutcome::NoPairs {
        bail!(
            "no city could be paired out of {}; likely a systemic fault (API key, site layout)",
            report.attempted
        );
    }
    Ok(())
}
