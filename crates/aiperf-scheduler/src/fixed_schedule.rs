//! Fixed-schedule pacing: replay a pre-recorded sequence of relative
//! issue timestamps.
//!
//! Grounded on `FixedScheduleStrategy` in the reference implementation,
//! which replays a trace of request offsets captured from a prior run (or
//! handwritten) rather than sampling a distribution. The trace is a sorted
//! list of nanosecond offsets from the run's start; `wait_slot` sleeps
//! until `start + offset` and hands back `scheduled_perf_ns` so the worker
//! (or, per the honored-only-by-the-scheduler design note, just the
//! scheduler) can detect schedule slippage.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::strategy::{CreditStrategy, CreditTiming};

pub struct FixedScheduleStrategy {
    /// Sorted, non-decreasing nanosecond offsets from `start`.
    offsets_ns: Vec<u64>,
    cursor: AtomicUsize,
    start: Mutex<Option<Instant>>,
}

impl FixedScheduleStrategy {
    pub fn new(mut offsets_ns: Vec<u64>) -> Self {
        offsets_ns.sort_unstable();
        Self {
            offsets_ns,
            cursor: AtomicUsize::new(0),
            start: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.offsets_ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets_ns.is_empty()
    }
}

#[async_trait]
impl CreditStrategy for FixedScheduleStrategy {
    async fn wait_slot(&self) -> Option<CreditTiming> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let offset_ns = *self.offsets_ns.get(index)?;

        let start = {
            let mut start = self.start.lock().await;
            *start.get_or_insert_with(Instant::now)
        };

        let target = start + std::time::Duration::from_nanos(offset_ns);
        let now = Instant::now();
        if target > now {
            tokio::time::sleep(target - now).await;
        }

        Some(CreditTiming {
            scheduled_perf_ns: Some(offset_ns),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_offsets_in_order_then_exhausts() {
        let strategy = FixedScheduleStrategy::new(vec![0, 10, 20]);
        assert_eq!(strategy.wait_slot().await.unwrap().scheduled_perf_ns, Some(0));
        assert_eq!(strategy.wait_slot().await.unwrap().scheduled_perf_ns, Some(10));
        assert_eq!(strategy.wait_slot().await.unwrap().scheduled_perf_ns, Some(20));
        assert!(strategy.wait_slot().await.is_none());
    }

    #[tokio::test]
    async fn unsorted_input_is_sorted_on_construction() {
        let strategy = FixedScheduleStrategy::new(vec![20, 0, 10]);
        assert_eq!(strategy.wait_slot().await.unwrap().scheduled_perf_ns, Some(0));
        assert_eq!(strategy.wait_slot().await.unwrap().scheduled_perf_ns, Some(10));
    }

    #[tokio::test]
    async fn empty_schedule_is_immediately_exhausted() {
        let strategy = FixedScheduleStrategy::new(vec![]);
        assert!(strategy.is_empty());
        assert!(strategy.wait_slot().await.is_none());
    }
}
