//! Per-request metric records and the aggregated results they roll up into.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::enums::MetricUnit;

/// A request-level failure. Carried on the record itself, never promoted to
/// an [`crate::error::AIPerfError`] — a request erroring does not stop the
/// run, it just gets `error_isl` recorded and is excluded from latency stats.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ErrorDetails {
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub request_type: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            request_type: None,
        }
    }
}

/// One metric's per-request value, tagged with the unit it was computed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub tag: String,
    pub value: f64,
    pub unit: MetricUnit,
}

/// An aggregated metric across every non-warmup, non-error record in a run:
/// avg/min/max/std plus the requested percentiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    pub tag: String,
    pub header: String,
    pub unit: MetricUnit,
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
    /// Percentile rank (e.g. `50`, `90`, `99`) to computed value, in the
    /// metric's display unit.
    pub percentiles: HashMap<u16, f64>,
}

/// One distinct error kind observed during a run, with how many requests hit
/// it. Grouped by `(request_type, code, message)` identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummaryEntry {
    pub request_type: Option<String>,
    pub code: Option<i64>,
    pub message: String,
    pub count: u64,
}

/// The final, exported summary of a profiling run: one [`MetricResult`] per
/// tracked metric, plus top-line throughput, request-count figures, and the
/// distinct error kinds observed, sorted by count descending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileResults {
    pub metrics: Vec<MetricResult>,
    pub request_count: u64,
    pub error_count: u64,
    /// Wall-clock Unix nanoseconds the profiling phase started/ended at.
    pub start_ns: u64,
    pub end_ns: u64,
    pub benchmark_duration_sec: f64,
    pub request_throughput: f64,
    /// `true` if the run was stopped early via `Controller::cancel` rather
    /// than reaching its configured count/duration/schedule-exhaustion bound.
    pub was_cancelled: bool,
    pub error_summary: Vec<ErrorSummaryEntry>,
    /// GPU telemetry samples collected alongside the run, folded in from
    /// the realtime telemetry stream at finalize time. Empty when no
    /// telemetry endpoint was configured.
    pub telemetry_data: Vec<crate::models::RealtimeMetricSnapshot>,
}
