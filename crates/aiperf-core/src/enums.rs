//! Shared enumerations used across the bus, scheduler, workers, and records manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A service's unique id, e.g. `worker_3f9a21bc`. Opaque beyond equality/display.
pub type ServiceId = String;

/// Lifecycle states every service moves through, in the order listed.
///
/// Transliterated from `BaseService` in the reference implementation
/// (`INITIALIZING -> READY -> STARTING -> RUNNING -> STOPPING -> STOPPED`,
/// with `ERROR` reachable from any state on failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Unknown,
    Initializing,
    Ready,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The kind of service in the cluster, used for topic-prefix routing
/// (`MessageType.{service_type}`) and for worker-pool scaling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Controller,
    TimingManager,
    Worker,
    WorkerManager,
    RecordProcessor,
    RecordsManager,
    DatasetManager,
    TelemetryCollector,
}

/// Bus message discriminant. Topic routing matches on `MessageType`,
/// `MessageType.{service_type}`, and `MessageType.{service_id}` prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Registration,
    Heartbeat,
    CreditDrop,
    CreditReturn,
    InferenceResults,
    MetricRecords,
    ProgressReport,
    RealtimeMetrics,
    RealtimeTelemetryMetrics,
    ConversationRequest,
    ConversationResponse,
    WorkerHealth,
    ProfileComplete,
    Error,
}

/// Warmup records are excluded from final statistics but progress-tracked
/// separately; profiling records feed `ProfileResults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPhase {
    Warmup,
    Profiling,
}

/// The scheduler strategy chosen for a run. Resolution order: fixed-schedule
/// if an input trace is supplied, concurrency if `--concurrency` is set,
/// otherwise request-rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    FixedSchedule,
    Concurrency,
    Rate,
}

/// Inter-arrival distribution for the request-rate strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    Poisson,
    Constant,
}

/// Inference endpoint wire formats; selects a [`crate::providers`]-level
/// response extractor at the record-processor layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Chat,
    Completions,
    Embeddings,
    Rankings,
    HuggingfaceGenerate,
    Templated,
}

/// How much of the raw pipeline output to retain/export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportLevel {
    /// Only the final summarised `ProfileResults`.
    Summary,
    /// Summary plus one `MetricRecordInfo` per request (`profile_export.jsonl`).
    Records,
    /// Summary, per-record metrics, and the raw `RequestRecord`s
    /// (`profile_export_raw.jsonl`).
    Raw,
}

/// Flags controlling whether a metric is surfaced in the default export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFlag {
    Experimental,
    Internal,
    StreamingOnly,
}

/// The unit a metric's raw values are measured in, before display conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Nanoseconds,
    Milliseconds,
    Seconds,
    Tokens,
    TokensPerSecond,
    Requests,
    RequestsPerSecond,
    Count,
    Ratio,
}

impl MetricUnit {
    /// The unit a metric is exported in. Per the glossary: "the unit in which
    /// a metric is exported, derived from its semantic unit (e.g. nanoseconds
    /// -> milliseconds for latencies)".
    pub fn display_unit(self) -> MetricUnit {
        match self {
            MetricUnit::Nanoseconds => MetricUnit::Milliseconds,
            other => other,
        }
    }

    /// Multiply a raw value in `self` by this factor to get a value in
    /// `self.display_unit()`.
    pub fn display_scale(self) -> f64 {
        match self {
            MetricUnit::Nanoseconds => 1.0 / 1_000_000.0,
            _ => 1.0,
        }
    }

    pub fn display_label(self) -> &'static str {
        match self.display_unit() {
            MetricUnit::Nanoseconds => "ns",
            MetricUnit::Milliseconds => "ms",
            MetricUnit::Seconds => "s",
            MetricUnit::Tokens => "tokens",
            MetricUnit::TokensPerSecond => "tokens/sec",
            MetricUnit::Requests => "requests",
            MetricUnit::RequestsPerSecond => "requests/sec",
            MetricUnit::Count => "",
            MetricUnit::Ratio => "",
        }
    }
}
