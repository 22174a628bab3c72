//! Output helpers shared by subcommands.

use crate::model::BatchStatistics;

/// Whether `--json` was requested.
pub fn is_json() -> bool {
    std::env::var("WXCHECK_JSON").is_ok_and(|v| v == "1")
}

/// Print a JSON value to stdout, pretty-printed.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// Human-readable statistics block.
pub fn print_statistics(stats: &BatchStatistics) {
    println!("  Mean discrepancy:   {:.2}°C", stats.mean_discrepancy);
    println!("  Max discrepancy:    {:.1}°C", stats.max_discrepancy);
    println!("  Min discrepancy:    {:.1}°C", stats.min_discrepancy);
    println!(
        "  Above {:.1}°C:       {} cities",
        stats.threshold, stats.cities_exceeding_threshold
    );
}
