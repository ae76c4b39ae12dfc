//! Records manager aggregation for AIPerf
//!
//! Owns everything downstream of the per-request `MetricRecord`s the
//! `aiperf-metrics` processors produce: running statistics, exact
//! percentiles, a windowed realtime view, and buffered JSONL persistence,
//! wired together by [`manager::RecordsManager`].

pub mod jsonl_writer;
pub mod manager;
pub mod percentile;
pub mod realtime;
pub mod running_summary;

pub use jsonl_writer::{BufferedJsonlWriter, JsonlWriterError};
pub use manager::{RecordsManager, RecordsManagerConfig, REQUEST_RECORD_QUEUE};
pub use percentile::ExactPercentiles;
pub use realtime::RealtimeWindow;
pub use running_summary::RunningSummary;
