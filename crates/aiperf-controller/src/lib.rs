//! Orchestrates one profiling session end to end: bootstraps a
//! `UserConfig`/`ServiceConfig` pair, wires the provider/client/extractor
//! collaborators, runs the warmup and profiling credit phases, and writes
//! the final export artifacts.
//!
//! Transliterated from the reference implementation's
//! `services/controller_service.py` + `base_service.py` lifecycle, adapted
//! to a single in-process `tokio` runtime rather than a multi-process ZMQ
//! deployment - every collaborator this crate wires together
//! (`aiperf-bus::LocalBus`, `aiperf-scheduler::Scheduler`,
//! `aiperf-worker::WorkerPool`, `aiperf-records::RecordsManager`) already
//! embodies that same design decision.

pub mod controller;
pub mod export;

pub use controller::{Controller, RunOutcome};
pub use export::write_artifacts;
