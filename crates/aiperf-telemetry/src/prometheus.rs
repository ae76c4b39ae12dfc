//! Scrapes a `dcgm-exporter`-shaped Prometheus text-exposition endpoint and
//! maps its `DCGM_FI_*` series onto [`GpuMetricSample`]s via the field table
//! in [`crate::dcgm`], extended with any custom metrics loaded from a CSV
//! config file.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;

use aiperf_core::error::{AIPerfError, AIPerfResult};

use crate::collector::{GpuMetricSample, TelemetryCollector};
use crate::dcgm::{lookup, DcgmFieldSpec};

/// A parsed Prometheus exposition-format line: `metric_name{labels} value`,
/// or `metric_name value` with no labels.
struct ExpositionLine {
    metric: String,
    labels: HashMap<String, String>,
    value: f64,
}

fn parse_exposition_text(text: &str) -> Vec<ExpositionLine> {
    let with_labels = Regex::new(r#"^(\w+)\{([^}]*)\}\s+([0-9eE+\-.]+|NaN|\+Inf|-Inf)\s*$"#).expect("static regex is valid");
    let bare = Regex::new(r#"^(\w+)\s+([0-9eE+\-.]+|NaN|\+Inf|-Inf)\s*$"#).expect("static regex is valid");
    let label_pair = Regex::new(r#"(\w+)="((?:[^"\\]|\\.)*)""#).expect("static regex is valid");

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(captures) = with_labels.captures(line) {
            let metric = captures[1].to_string();
            let Ok(value) = captures[3].parse::<f64>() else { continue };
            let mut labels = HashMap::new();
            for pair in label_pair.captures_iter(&captures[2]) {
                labels.insert(pair[1].to_string(), pair[2].to_string());
            }
            lines.push(ExpositionLine { metric, labels, value });
        } else if let Some(captures) = bare.captures(line) {
            let metric = captures[1].to_string();
            let Ok(value) = captures[2].parse::<f64>() else { continue };
            lines.push(ExpositionLine { metric, labels: HashMap::new(), value });
        }
    }
    lines
}

fn gpu_index_of(labels: &HashMap<String, String>) -> u32 {
    labels.get("gpu").or_else(|| labels.get("GPU_I_ID")).and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Maps parsed exposition lines onto [`GpuMetricSample`]s using `fields`
/// (the default table plus any custom additions) to resolve display names
/// and units.
fn map_to_samples(lines: &[ExpositionLine], fields: &[DcgmFieldSpec]) -> Vec<GpuMetricSample> {
    let mut samples = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(spec) = fields.iter().find(|spec| spec.dcgm_field == line.metric) else {
            continue;
        };
        samples.push(GpuMetricSample {
            gpu_index: gpu_index_of(&line.labels),
            internal_name: spec.internal_name.to_string(),
            display_name: spec.display_name.to_string(),
            value: line.value,
            unit: spec.unit,
        });
    }
    samples
}

/// Scrapes a `dcgm-exporter`-compatible `/metrics` endpoint over HTTP.
pub struct PrometheusTextTelemetryCollector {
    client: reqwest::Client,
    endpoint_url: String,
    fields: Vec<DcgmFieldSpec>,
}

impl PrometheusTextTelemetryCollector {
    /// `extra_fields` are prepended to the built-in default table, so a
    /// custom metric with the same DCGM field name as a default shadows it.
    pub fn new(endpoint_url: impl Into<String>, extra_fields: Vec<DcgmFieldSpec>) -> Self {
        let mut fields = extra_fields;
        fields.extend(crate::dcgm::DEFAULT_FIELDS.iter().copied());
        Self {
            client: reqwest::Client::new(),
            endpoint_url: endpoint_url.into(),
            fields,
        }
    }
}

#[async_trait]
impl TelemetryCollector for PrometheusTextTelemetryCollector {
    async fn collect(&self) -> AIPerfResult<Vec<GpuMetricSample>> {
        let text = self
            .client
            .get(&self.endpoint_url)
            .send()
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to scrape {}: {e}", self.endpoint_url)))?
            .text()
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to read telemetry body from {}: {e}", self.endpoint_url)))?;

        let lines = parse_exposition_text(&text);
        Ok(map_to_samples(&lines, &self.fields))
    }
}

/// Looks up a single known field by its DCGM name, for callers that want one
/// reading rather than a whole collector (e.g. tests, diagnostics).
pub fn lookup_default(dcgm_field: &str) -> Option<DcgmFieldSpec> {
    lookup(dcgm_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcgm::TelemetryUnit;

    const SAMPLE_TEXT: &str = r#"
# HELP DCGM_FI_DEV_POWER_USAGE Power draw (in W)
# TYPE DCGM_FI_DEV_POWER_USAGE gauge
DCGM_FI_DEV_POWER_USAGE{gpu="0",UUID="GPU-abc"} 123.45
DCGM_FI_DEV_POWER_USAGE{gpu="1",UUID="GPU-def"} 110.00
DCGM_FI_DEV_GPU_UTIL{gpu="0",UUID="GPU-abc"} 87
unrelated_metric{gpu="0"} 1
"#;

    #[test]
    fn parses_labeled_lines_and_skips_comments() {
        let lines = parse_exposition_text(SAMPLE_TEXT);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].metric, "DCGM_FI_DEV_POWER_USAGE");
        assert_eq!(lines[0].labels.get("gpu").unwrap(), "0");
    }

    #[test]
    fn maps_recognized_fields_and_drops_unknown_ones() {
        let lines = parse_exposition_text(SAMPLE_TEXT);
        let samples = map_to_samples(&lines, crate::dcgm::DEFAULT_FIELDS);
        assert_eq!(samples.len(), 3);
        let power = samples.iter().find(|s| s.internal_name == "power_usage" && s.gpu_index == 1).unwrap();
        assert_eq!(power.value, 110.00);
        assert_eq!(power.unit, TelemetryUnit::Watt);
    }
}
