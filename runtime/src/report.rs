//! CSV and HTML rendering of observations and statistics.

use crate::error::Result;
use crate::model::{BatchStatistics, PairedObservation};
use chrono::{DateTime, Local};
use html_escape::encode_text;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

const HEADERS: [&str; 9] = [
    "City",
    "Web Temperature (°C)",
    "API Temperature (°C)",
    "Average Temperature (°C)",
    "Temperature Difference (°C)",
    "Web Feels Like (°C)",
    "API Feels Like (°C)",
    "Feels Like Difference (°C)",
    "Exceeds Threshold",
];

/// Paths of the artifacts written by [`write_reports`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub html: PathBuf,
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}"))
}

fn row_cells(obs: &PairedObservation, threshold: f64) -> [String; 9] {
    let exceeds = match obs.discrepancy {
        Some(_) if obs.exceeds(threshold) => "Yes",
        Some(_) => "No",
        None => "N/A",
    };
    [
        obs.city.clone(),
        fmt_opt(obs.temperature_web),
        fmt_opt(obs.temperature_api),
        fmt_opt(obs.avg_temperature),
        fmt_opt(obs.discrepancy),
        fmt_opt(obs.feels_like_web),
        fmt_opt(obs.feels_like_api),
        fmt_opt(obs.feels_like_discrepancy()),
        exceeds.to_string(),
    ]
}

fn statistics_rows(stats: &BatchStatistics) -> [(&'static str, String); 5] {
    [
        ("Mean Temperature Difference (°C)", format!("{:.2}", stats.mean_discrepancy)),
        ("Maximum Temperature Difference (°C)", format!("{:.1}", stats.max_discrepancy)),
        ("Minimum Temperature Difference (°C)", format!("{:.1}", stats.min_discrepancy)),
        ("Cities Exceeding Threshold", stats.cities_exceeding_threshold.to_string()),
        ("Temperature Threshold (°C)", format!("{:.1}", stats.threshold)),
    ]
}

/// Render the CSV report to a string.
pub fn render_csv(
    observations: &[PairedObservation],
    stats: &BatchStatistics,
    generated_at: DateTime<Local>,
) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(HEADERS)?;
    for obs in observations {
        writer.write_record(row_cells(obs, stats.threshold))?;
    }

    writer.write_record([""])?;
    writer.write_record(["Summary Statistics"])?;
    writer.write_record(["Metric", "Value"])?;
    for (label, value) in statistics_rows(stats) {
        writer.write_record([label, value.as_str()])?;
    }
    writer.write_record([""])?;
    writer.write_record([
        "Report Generated",
        generated_at.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
    ])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::WxError::Report(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| crate::error::WxError::Report(e.to_string()))
}

/// Render the HTML report to a string. Rows above the threshold are highlighted.
pub fn render_html(
    observations: &[PairedObservation],
    stats: &BatchStatistics,
    generated_at: DateTime<Local>,
) -> String {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Weather Comparison Report</title>\n<style>\n\
         body { font-family: Arial, sans-serif; margin: 20px; }\n\
         table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }\n\
         th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
         th { background-color: #f2f2f2; }\n\
         .exceeds { background-color: #ffebee; }\n\
         .stats { background-color: #f5f5f5; padding: 15px; border-radius: 5px; }\n\
         </style>\n</head>\n<body>\n<h1>Weather Comparison Report</h1>\n",
    );
    let _ = writeln!(
        html,
        "<p>Generated on: {}</p>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    html.push_str("<h2>Temperature Comparison</h2>\n<table>\n<tr>");
    for header in HEADERS {
        let _ = write!(html, "<th>{}</th>", encode_text(header));
    }
    html.push_str("</tr>\n");

    for obs in observations {
        let class = if obs.exceeds(stats.threshold) {
            " class=\"exceeds\""
        } else {
            ""
        };
        let _ = write!(html, "<tr{class}>");
        for cell in row_cells(obs, stats.threshold) {
            let _ = write!(html, "<td>{}</td>", encode_text(&cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n<div class=\"stats\">\n<h2>Statistics</h2>\n");
    for (label, value) in statistics_rows(stats) {
        let _ = writeln!(html, "<p>{}: {}</p>", encode_text(label), encode_text(&value));
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// Write `weather_report_<timestamp>.csv` and `.html` into `dir`.
pub fn write_reports(
    dir: &Path,
    observations: &[PairedObservation],
    stats: &BatchStatistics,
) -> Result<ReportPaths> {
    std::fs::create_dir_all(dir)?;
    let now = Local::now();
    let stem = format!("weather_report_{}", now.format("%Y%m%d_%H%M%S"));

    let csv = dir.join(format!("{stem}.csv"));
    std::fs::write(&csv, render_csv(observations, stats, now)?)?;

    let html = dir.join(format!("{stem}.html"));
    std::fs::write(&html, render_html(observations, stats, now))?;

    info!("reports written: {} and {}", csv.display(), html.display());
    Ok(ReportPaths { csv, html })
}
