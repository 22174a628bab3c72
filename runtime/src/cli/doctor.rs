//! Environment readiness check.

use crate::config::{resolve_config_path, Config};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability, API key presence, and storage paths.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("wxcheck Doctor");
    println!("==============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match resolve_config_path(config_path) {
        Some(path) => println!("[OK] Config file: {}", path.display()),
        None => println!("[--] No config file; using defaults and environment"),
    }

    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            println!("[!!] {e}");
            println!();
            println!("Status: NOT READY");
            return Ok(());
        }
    };

    let chromium = config.chromium_path.clone().or_else(find_chromium);
    match &chromium {
        Some(path) if path.exists() => println!("[OK] Chromium found: {}", path.display()),
        Some(path) => println!("[!!] Chromium path does not exist: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set WXCHECK_CHROMIUM_PATH or install Chrome."),
    }

    let has_key = !config.api_key.is_empty();
    if has_key {
        println!("[OK] API key configured");
    } else {
        println!("[!!] No API key. Set WXCHECK_API_KEY or `api_key` in the config file.");
    }

    match config.validate() {
        Ok(()) => println!(
            "[OK] {} cities, threshold {:.1}°C, {} attempts per city",
            config.cities.len(),
            config.threshold,
            config.max_retries
        ),
        Err(e) => println!("[!!] {e}"),
    }

    println!("[--] Database: {}", config.db_path.display());
    println!("[--] Reports:  {}", config.report_dir.display());

    println!();
    let ready = chromium.is_some_and(|p| p.exists()) && has_key && config.validate().is_ok();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
