// Copyright 2026 wxcheck Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use wxcheck::cli;

#[derive(Parser)]
#[command(
    name = "wxcheck",
    about = "Cross-validate weather page readings against a weather API",
    version,
    after_help = "Run 'wxcheck <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Path to a JSON config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch: scrape, query the API, reconcile, store, report
    Run {
        /// Discrepancy threshold in °C
        #[arg(long)]
        threshold: Option<f64>,
        /// Restrict the batch to these cities. Can be repeated.
        #[arg(long = "city")]
        cities: Vec<String>,
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for CSV/HTML reports
        #[arg(long)]
        report_dir: Option<PathBuf>,
        /// Skip writing reports
        #[arg(long)]
        no_report: bool,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Write CSV/HTML reports from stored observations
    Report {
        /// Only include rows whose discrepancy exceeds this (°C)
        #[arg(long)]
        threshold: Option<f64>,
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory for CSV/HTML reports
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Print statistics over every stored observation
    Stats {
        /// Discrepancy threshold in °C
        #[arg(long)]
        threshold: Option<f64>,
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.json {
        std::env::set_var("WXCHECK_JSON", "1");
    }
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Run {
            threshold,
            cities,
            db,
            report_dir,
            no_report,
            headful,
        } => {
            cli::run_cmd::run(
                config,
                cli::run_cmd::RunArgs {
                    threshold,
                    cities,
                    db,
                    report_dir,
                    no_report,
                    headful,
                },
            )
            .await
        }
        Commands::Report {
            threshold,
            db,
            report_dir,
        } => cli::report_cmd::run_report(config, threshold, db, report_dir),
        Commands::Stats { threshold, db } => cli::report_cmd::run_stats(config, threshold, db),
        Commands::Doctor => cli::doctor::run(config).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "wxcheck", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
