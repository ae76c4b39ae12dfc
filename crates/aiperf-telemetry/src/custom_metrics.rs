//! User-supplied custom GPU metrics, loaded from a DCGM-style CSV config
//! file. Transliterates `MetricsConfigLoader` in
//! `original_source/src/aiperf/gpu_telemetry/metrics_config.py`: each line is
//! `DCGM_FIELD_NAME, metric_type, help message`, where the help message's
//! trailing `(in UNIT)` is used to infer the metric's unit and the text
//! before it becomes the display name.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;

use crate::dcgm::{DcgmFieldSpec, TelemetryUnit, DEFAULT_FIELDS};

/// Acronyms kept fully capitalized by [`title_case_metric_name`].
const ACRONYMS: &[&str] = &["gpu", "xid", "sm", "nvlink", "pci", "pcie", "cpu", "ram", "vram", "ecc"];

/// Title-cases a metric display name, keeping known acronyms uppercase
/// (`"gpu power usage"` -> `"GPU Power Usage"`).
pub fn title_case_metric_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            if ACRONYMS.contains(&word.to_lowercase().as_str()) {
                word.to_uppercase()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One raw `(dcgm_field, metric_type, help_message)` line parsed out of a
/// custom metrics CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMetricLine {
    pub dcgm_field: String,
    pub metric_type: String,
    pub help_message: String,
}

/// Parses a DCGM-style custom metrics CSV. Comment lines (`#...`) and blank
/// lines are skipped; malformed lines are skipped with a warning rather than
/// failing the whole file, matching the reference loader's tolerance.
pub fn parse_custom_metrics_csv(contents: &str) -> Vec<CustomMetricLine> {
    let mut lines = Vec::new();

    for (line_num, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.splitn(3, ',').map(str::trim).collect();
        if parts.len() != 3 {
            tracing::warn!(line_num = line_num + 1, "skipping invalid custom metrics line: expected 3 comma-separated values, got {}", parts.len());
            continue;
        }

        let (dcgm_field, metric_type, help_message) = (parts[0], parts[1], parts[2]);

        if !dcgm_field.starts_with("DCGM_FI_") {
            tracing::warn!(line_num = line_num + 1, "skipping custom metrics line: DCGM field '{dcgm_field}' should start with DCGM_FI_");
            continue;
        }
        if metric_type != "gauge" && metric_type != "counter" {
            tracing::warn!(line_num = line_num + 1, "skipping custom metrics line: metric type '{metric_type}' should be gauge or counter");
            continue;
        }

        lines.push(CustomMetricLine {
            dcgm_field: dcgm_field.to_string(),
            metric_type: metric_type.to_string(),
            help_message: help_message.to_string(),
        });
    }

    lines
}

/// Extracts the unit from a help message's trailing `(in UNIT)` annotation,
/// defaulting to [`TelemetryUnit::Count`] when none is present or
/// recognized.
pub fn infer_unit_from_help(help_message: &str) -> TelemetryUnit {
    let pattern = Regex::new(r"(?i)\(in\s+([^)]+)\)").expect("static regex is valid");
    let Some(captures) = pattern.captures(help_message) else {
        return TelemetryUnit::Count;
    };
    let unit_str = captures.get(1).map(|m| m.as_str()).unwrap_or_default().trim().to_lowercase();

    match unit_str.as_str() {
        "w" => TelemetryUnit::Watt,
        "%" | "percent" => TelemetryUnit::Percent,
        "gb" => TelemetryUnit::Gigabytes,
        "mb" => TelemetryUnit::Megabytes,
        "kb" => TelemetryUnit::Kilobytes,
        "mhz" => TelemetryUnit::Megahertz,
        "ghz" => TelemetryUnit::Gigahertz,
        "c" | "\u{b0}c" | "celsius" => TelemetryUnit::Celsius,
        "us" => TelemetryUnit::Microseconds,
        "ms" => TelemetryUnit::Milliseconds,
        "s" => TelemetryUnit::Seconds,
        "mj" => TelemetryUnit::Megajoule,
        "j" => TelemetryUnit::Joule,
        _ => TelemetryUnit::Count,
    }
}

/// Builds the new custom-metric specs a CSV file adds on top of
/// [`DEFAULT_FIELDS`], skipping any DCGM field already covered by the
/// defaults. Returned specs use `'static`-lifetime-free owned strings
/// leaked for the process lifetime, matching [`DcgmFieldSpec`]'s `&'static
/// str` fields - acceptable here since custom metric configs are loaded
/// once per run, not per request.
pub fn build_custom_metrics(contents: &str) -> Vec<DcgmFieldSpec> {
    let existing_fields: HashSet<&str> = DEFAULT_FIELDS.iter().map(|spec| spec.dcgm_field).collect();
    let mut custom = Vec::new();

    for line in parse_custom_metrics_csv(contents) {
        if existing_fields.contains(line.dcgm_field.as_str()) {
            tracing::debug!(field = %line.dcgm_field, "skipping DCGM field already in default config");
            continue;
        }

        let internal_name = line.dcgm_field.trim_start_matches("DCGM_FI_DEV_").to_lowercase();
        let raw_display_name = line.help_message.split('(').next().unwrap_or_default().trim();
        let display_name = if raw_display_name.is_empty() {
            title_case_metric_name(&internal_name.replace('_', " "))
        } else {
            title_case_metric_name(raw_display_name)
        };
        let unit = infer_unit_from_help(&line.help_message);

        custom.push(DcgmFieldSpec {
            dcgm_field: Box::leak(line.dcgm_field.into_boxed_str()),
            internal_name: Box::leak(internal_name.into_boxed_str()),
            display_name: Box::leak(display_name.into_boxed_str()),
            unit,
        });
    }

    custom
}

/// Convenience wrapper reading a CSV file from disk before parsing it.
pub fn load_custom_metrics_file(path: &Path) -> std::io::Result<Vec<DcgmFieldSpec>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(build_custom_metrics(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_and_preserves_acronyms() {
        assert_eq!(title_case_metric_name("gpu power usage"), "GPU Power Usage");
        assert_eq!(title_case_metric_name("xid errors"), "XID Errors");
        assert_eq!(title_case_metric_name("sm clock frequency"), "SM Clock Frequency");
    }

    #[test]
    fn infers_unit_from_help_suffix() {
        assert_eq!(infer_unit_from_help("Power draw (in W)"), TelemetryUnit::Watt);
        assert_eq!(infer_unit_from_help("GPU utilization (in %)"), TelemetryUnit::Percent);
        assert_eq!(infer_unit_from_help("no unit here"), TelemetryUnit::Count);
    }

    #[test]
    fn parses_valid_lines_and_skips_malformed_ones() {
        let csv = "# comment\n\nDCGM_FI_DEV_SM_CLOCK, gauge, SM clock frequency (in MHz)\nnot,enough\nDCGM_FI_DEV_BAD, invalid_type, Bad metric\nplain_field, gauge, Missing prefix\n";
        let lines = parse_custom_metrics_csv(csv);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].dcgm_field, "DCGM_FI_DEV_SM_CLOCK");
    }

    #[test]
    fn skips_fields_already_in_defaults() {
        let csv = "DCGM_FI_DEV_POWER_USAGE, gauge, Power draw (in W)\nDCGM_FI_DEV_NVLINK_BANDWIDTH, gauge, NVLink bandwidth (in MB)\n";
        let custom = build_custom_metrics(csv);
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].internal_name, "nvlink_bandwidth");
        assert_eq!(custom[0].display_name, "NVLink Bandwidth");
        assert_eq!(custom[0].unit, TelemetryUnit::Megabytes);
    }
}
