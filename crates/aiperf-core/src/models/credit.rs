//! Credit-based flow control between the timing manager and the worker pool.
//!
//! One outstanding credit authorizes exactly one in-flight request; a worker
//! must return its credit (via [`CreditReturn`]) before the scheduler will
//! issue another, which is what makes the concurrency strategy's in-flight
//! count exact rather than approximate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::CreditPhase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDrop {
    pub credit_id: Uuid,
    pub conversation_id: String,
    pub phase: CreditPhase,
    /// Monotonically increasing within a phase, starting at 0.
    pub credit_num: u64,
    /// Monotonic perf-clock nanoseconds at which the scheduler issued this
    /// credit; used as the anchor for `compute_time_ns`.
    pub issued_perf_ns: u64,
    /// If set, the worker must not send the request before this scheduled
    /// perf-clock time (fixed-schedule strategy only).
    pub scheduled_perf_ns: Option<u64>,
    /// If set, every request driven by this credit is treated as cancelled
    /// once this perf-clock time has passed, enforcing
    /// `benchmark_duration_sec` plus its grace period. Independent of
    /// `should_cancel`/`cancel_after_ns` below, which model per-request
    /// cancellation instead of a whole-phase cutoff.
    pub phase_deadline_perf_ns: Option<u64>,
    /// Whether this credit was drawn to exercise per-request cancellation
    /// (`--request-cancellation-rate`).
    pub should_cancel: bool,
    /// Delay, in nanoseconds, after which a `should_cancel` request's
    /// in-flight inference call is aborted. Unused when `should_cancel` is
    /// false.
    pub cancel_after_ns: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReturn {
    pub credit_id: Uuid,
    pub phase: CreditPhase,
    /// `true` if the request errored or was cancelled before completion;
    /// the scheduler uses this only for progress reporting, never to hold
    /// back the next credit.
    pub had_error: bool,
}

/// Running issue/return counters for one credit phase, tracked by the
/// scheduler for progress reporting and by the records manager for the
/// warmup/profiling split.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CreditPhaseStats {
    pub issued: u64,
    pub returned: u64,
    pub errored: u64,
}

impl CreditPhaseStats {
    pub fn in_flight(&self) -> u64 {
        self.issued.saturating_sub(self.returned)
    }
}
