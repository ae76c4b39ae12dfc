//! The `RecordProcessor` seam: one implementation per metric family, fed a
//! `RequestRecord` and a tokenizer, producing zero or more `MetricRecord`s.
//!
//! Record processors run independently of each other (no ordering
//! requirement between records from different workers, per the processing
//! model) and are fanned out over by `run_all` the same way the reference
//! `record_processor_service.py` gathers over `self.records_processors`.

use aiperf_core::models::{MetricRecord, RequestRecord};
use aiperf_core::providers::Tokenizer;

/// Computes a metric family's `MetricRecord`s for one `RequestRecord`.
/// Implementations must not assume records arrive in any particular order
/// and must not depend on state from other records - each call is
/// self-contained.
pub trait RecordProcessor: Send + Sync {
    /// Name used in logs when a processor panics or errors; not exported.
    fn name(&self) -> &'static str;

    fn process(&self, record: &RequestRecord, tokenizer: &dyn Tokenizer) -> Vec<MetricRecord>;
}

/// Runs every processor over one record and concatenates their output.
/// A processor that emits nothing for a given record (e.g. `inter_chunk_latency`
/// on a non-streaming response) simply contributes no entries.
pub fn run_all(processors: &[Box<dyn RecordProcessor>], record: &RequestRecord, tokenizer: &dyn Tokenizer) -> Vec<MetricRecord> {
    let mut out = Vec::new();
    for processor in processors {
        out.extend(processor.process(record, tokenizer));
    }
    out
}

/// The default set of processors, applied to every record in this order.
pub fn default_processors() -> Vec<Box<dyn RecordProcessor>> {
    vec![
        Box::new(crate::latency::LatencyProcessor),
        Box::new(crate::sequence::SequenceLengthProcessor),
        Box::new(crate::usage::UsageProcessor),
        Box::new(crate::error_metrics::GoodRequestCountProcessor),
    ]
}
