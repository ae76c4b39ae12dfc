//! The [`CreditStrategy`] seam every credit-issuing strategy implements.
//!
//! Grounded on the reference implementation's `CreditIssuingStrategy` base
//! class in `timing_manager/credit_issuing_strategy.py`: each concrete
//! strategy owns its own pacing (a semaphore for concurrency, a sampled
//! inter-arrival sleep for request-rate, a trace cursor for fixed-schedule)
//! and the scheduler only asks it "when may I issue the next credit, and
//! with what scheduling metadata".

use async_trait::async_trait;
use uuid::Uuid;

/// Scheduling metadata attached to a credit at issue time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditTiming {
    /// Fixed-schedule only: the perf-clock time the request is scheduled
    /// for. The scheduler honors this; per the reference implementation's
    /// `worker.py`, the worker itself does not re-check it.
    pub scheduled_perf_ns: Option<u64>,
}

#[async_trait]
pub trait CreditStrategy: Send + Sync {
    /// Awaits this strategy's pacing (a free concurrency slot, an
    /// inter-arrival sleep, or a scheduled fixed-schedule timestamp), then
    /// returns the next credit's timing metadata, or `None` if the
    /// strategy itself has no more credits to give out (only the
    /// fixed-schedule strategy, once its trace is exhausted, returns
    /// `None`; concurrency and rate are unbounded and rely on the
    /// scheduler's own request-count/duration cutoff).
    async fn wait_slot(&self) -> Option<CreditTiming>;

    /// Notifies the strategy that the credit with this id has been
    /// returned (its request completed, successfully or not). Only the
    /// concurrency strategy needs this, to free the slot `wait_slot` gated
    /// on; other strategies ignore it.
    async fn on_return(&self, credit_id: Uuid) {
        let _ = credit_id;
    }
}
