//! GPU telemetry collection: a `TelemetryCollector` trait seam plus a
//! reference implementation scraping a `dcgm-exporter`-shaped Prometheus
//! text endpoint, with support for user-supplied custom metric CSVs.

pub mod collector;
pub mod custom_metrics;
pub mod dcgm;
pub mod prometheus;

pub use collector::{GpuMetricSample, TelemetryCollector};
pub use custom_metrics::{build_custom_metrics, infer_unit_from_help, load_custom_metrics_file, parse_custom_metrics_csv, title_case_metric_name};
pub use dcgm::{DcgmFieldSpec, TelemetryUnit, DEFAULT_FIELDS};
pub use prometheus::PrometheusTextTelemetryCollector;
