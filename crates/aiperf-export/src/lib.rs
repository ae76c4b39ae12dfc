//! Final artifact writers for a completed profiling run.
//!
//! Per-record JSONL artifacts (`profile_export.jsonl`,
//! `profile_export_raw.jsonl`) are written as a run progresses by
//! `aiperf-records::BufferedJsonlWriter`; this crate writes the artifacts
//! that only make sense once a run has finished: the summary JSON, the CSV
//! table, and the reproducibility-tested `inputs.json`.

pub mod csv;
pub mod inputs;
pub mod summary;

pub use csv::{render_csv, write_csv};
pub use inputs::{write_inputs, InputsRecord, SubmittedTurn};
pub use summary::{write_summary, ProfileSummary};
