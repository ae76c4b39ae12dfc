//! Writes `profile_export_aiperf.csv`: one row per tracked metric, in its
//! display unit. Hand-rolled rather than pulled from a crate - the column
//! set is fixed and small enough that a dependency buys nothing a `write!`
//! loop doesn't already give us, and nothing else in this workspace needs
//! general-purpose CSV parsing.

use std::path::Path;

use aiperf_core::error::{AIPerfError, AIPerfResult};
use aiperf_core::models::{MetricResult, ProfileResults};

const PERCENTILE_COLUMNS: [u16; 6] = [1, 25, 50, 75, 95, 99];

/// Escapes a field per RFC 4180: wrap in quotes and double any embedded
/// quote if the field contains a comma, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_metric_row(metric: &MetricResult) -> String {
    let mut fields = vec![
        escape_field(&metric.header),
        metric.unit.display_label().to_string(),
        metric.count.to_string(),
        metric.avg.to_string(),
        metric.min.to_string(),
        metric.max.to_string(),
        metric.std.to_string(),
    ];
    for rank in PERCENTILE_COLUMNS {
        let value = metric.percentiles.get(&rank).copied();
        fields.push(value.map(|v| v.to_string()).unwrap_or_default());
    }
    fields.join(",")
}

fn header_row() -> String {
    let mut columns = vec!["metric".to_string(), "unit".to_string(), "count".to_string(), "avg".to_string(), "min".to_string(), "max".to_string(), "std".to_string()];
    for rank in PERCENTILE_COLUMNS {
        columns.push(format!("p{rank}"));
    }
    columns.join(",")
}

/// Renders `results` as a CSV document, one data row per metric in the
/// order they appear in `results.metrics`.
pub fn render_csv(results: &ProfileResults) -> String {
    let mut out = String::new();
    out.push_str(&header_row());
    out.push('\n');
    for metric in &results.metrics {
        out.push_str(&format_metric_row(metric));
        out.push('\n');
    }
    out
}

/// Writes `profile_export_aiperf.csv` to `artifact_dir`.
pub async fn write_csv(artifact_dir: &Path, results: &ProfileResults) -> AIPerfResult<()> {
    let path = artifact_dir.join("profile_export_aiperf.csv");
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to create artifact dir {}: {e}", parent.display())))?;
    }
    tokio::fs::write(&path, render_csv(results))
        .await
        .map_err(|e| AIPerfError::comms(format!("failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "wrote profile CSV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::MetricUnit;
    use std::collections::HashMap;

    fn sample_metric() -> MetricResult {
        let mut percentiles = HashMap::new();
        percentiles.insert(50, 12.5);
        percentiles.insert(99, 40.0);
        MetricResult {
            tag: "request_latency".to_string(),
            header: "Request Latency".to_string(),
            unit: MetricUnit::Milliseconds,
            count: 10,
            avg: 15.0,
            min: 5.0,
            max: 50.0,
            std: 3.2,
            percentiles,
        }
    }

    #[test]
    fn header_matches_column_count() {
        let header = header_row();
        assert_eq!(header.split(',').count(), 7 + PERCENTILE_COLUMNS.len());
    }

    #[test]
    fn renders_known_percentiles_and_blanks_missing_ones() {
        let mut results = ProfileResults::default();
        results.metrics.push(sample_metric());
        let csv = render_csv(&results);
        let data_row = csv.lines().nth(1).unwrap();
        let fields: Vec<&str> = data_row.split(',').collect();
        assert_eq!(fields[0], "Request Latency");
        assert_eq!(fields[2], "10");
        // p50 is the 3rd percentile column (index 7 + 2)
        assert_eq!(fields[9], "12.5");
        // p25 has no recorded value and renders as an empty field
        assert_eq!(fields[8], "");
    }

    #[test]
    fn escapes_headers_containing_commas() {
        let mut metric = sample_metric();
        metric.header = "Inter, Chunk".to_string();
        let row = format_metric_row(&metric);
        assert!(row.starts_with("\"Inter, Chunk\","));
    }
}
