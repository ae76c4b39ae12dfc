//! Per-request metric record processors for AIPerf
//!
//! Each processor in this crate implements [`processor::RecordProcessor`]
//! for one metric family (latency, sequence length, usage tokens, error
//! classification); [`processor::run_all`] fans a `RequestRecord` out across
//! the default set and gathers the resulting `MetricRecord`s, the same shape
//! as the reference implementation's record processor service.

pub mod dict;
pub mod error_metrics;
pub mod latency;
pub mod processor;
pub mod sequence;
pub mod usage;

pub use dict::MetricSpec;
pub use processor::{default_processors, run_all, RecordProcessor};
