//! The scheduler service: issues [`CreditDrop`]s paced by a
//! [`CreditStrategy`] and tracks how many have been returned.
//!
//! Grounded on `TimingManager` in the reference implementation's
//! `timing_manager` service: one task paces and issues credits while a
//! second drains the `CreditReturn` stream, so a slow consumer of returns
//! never stalls the issuing side (and vice versa) - the same
//! producer/consumer split `Pipeline::start` uses for raw capture events
//! vs. the processing task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aiperf_bus::{LocalBus, Topic};
use aiperf_core::models::{CreditDrop, CreditReturn, Message, MessagePayload};
use aiperf_core::{AIPerfResult, CreditPhase, CreditPhaseStats, MessageType, ServiceId, ServiceType};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cancellation;
use crate::request_cancellation::RequestCancellationDraw;
use crate::strategy::CreditStrategy;

pub const CREDIT_QUEUE: &str = "credits";

/// When a phase's issuing loop should stop requesting new credits.
#[derive(Debug, Clone, Copy)]
pub enum PhaseStop {
    /// Stop after issuing exactly this many credits.
    Count(u64),
    /// Stop once this much wall-clock time has elapsed since the phase
    /// started.
    Duration(Duration),
    /// Keep issuing until the strategy itself reports exhaustion
    /// (fixed-schedule trace fully replayed).
    StrategyExhaustion,
}

pub struct Scheduler {
    bus: LocalBus,
    strategy: Arc<dyn CreditStrategy>,
    service_id: ServiceId,
    benchmark_duration_sec: Option<f64>,
    grace_period_sec: f64,
    request_cancellation: RequestCancellationDraw,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: LocalBus,
        strategy: Arc<dyn CreditStrategy>,
        service_id: ServiceId,
        benchmark_duration_sec: Option<f64>,
        grace_period_sec: f64,
        request_cancellation_rate: f64,
        request_cancellation_delay_sec: f64,
        seed: Option<u64>,
    ) -> Self {
        Self {
            bus,
            strategy,
            service_id,
            benchmark_duration_sec,
            grace_period_sec,
            request_cancellation: RequestCancellationDraw::new(request_cancellation_rate, request_cancellation_delay_sec, seed),
        }
    }

    /// Runs one credit phase to completion, issuing credits onto
    /// [`CREDIT_QUEUE`] for the worker pool to pull, and draining
    /// `CreditReturn` publications to track progress and release
    /// concurrency slots. Stops early, before `stop` is satisfied, if
    /// `cancel_flag` flips to `true` (set by `Controller::cancel`). Returns
    /// the phase's final issue/return/error counts.
    pub async fn run_phase(&self, phase: CreditPhase, stop: PhaseStop, conversation_count: usize, cancel_flag: &AtomicBool) -> AIPerfResult<CreditPhaseStats> {
        let stats = Arc::new(Mutex::new(CreditPhaseStats::default()));
        let done = Arc::new(AtomicBool::new(false));

        let mut returns_sub = self.bus.subscribe(Topic::Any(MessageType::CreditReturn));
        let return_task = tokio::spawn({
            let stats = stats.clone();
            let strategy = self.strategy.clone();
            let done = done.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = wait_until_done(&done) => break,
                        message = returns_sub.recv() => {
                            let Ok(message) = message else { break };
                            if let MessagePayload::CreditReturn(ref credit_return) = message.payload {
                                record_return(&stats, credit_return).await;
                                strategy.on_return(credit_return.credit_id).await;
                            }
                        }
                    }
                }
            }
        });

        let phase_start = Instant::now();
        let run_start_perf_ns = aiperf_core::time::perf_ns();
        let mut issued: u64 = 0;

        loop {
            if cancel_flag.load(Ordering::SeqCst) || self.stop_condition_met(stop, issued, phase_start) {
                break;
            }

            let Some(timing) = self.strategy.wait_slot().await else {
                break;
            };

            let credit_id = Uuid::new_v4();
            let conversation_id = if conversation_count == 0 {
                "0".to_string()
            } else {
                (issued as usize % conversation_count).to_string()
            };

            let (should_cancel, cancel_after_ns) = self.request_cancellation.draw().await;

            let drop = CreditDrop {
                credit_id,
                conversation_id,
                phase,
                credit_num: issued,
                issued_perf_ns: aiperf_core::time::perf_ns(),
                scheduled_perf_ns: timing.scheduled_perf_ns,
                phase_deadline_perf_ns: cancellation::phase_deadline_perf_ns(run_start_perf_ns, self.benchmark_duration_sec, self.grace_period_sec),
                should_cancel,
                cancel_after_ns,
            };

            self.bus
                .push(
                    CREDIT_QUEUE,
                    Message {
                        message_type: MessageType::CreditDrop,
                        service_type: ServiceType::TimingManager,
                        service_id: self.service_id.clone(),
                        payload: MessagePayload::CreditDrop(drop),
                    },
                )
                .await
                .map_err(|e| aiperf_core::AIPerfError::comms(e.to_string()))?;

            issued += 1;
            stats.lock().await.issued = issued;
        }

        // Let any in-flight requests return before declaring the phase done;
        // the controller is responsible for a final bounded drain.
        tokio::time::sleep(Duration::from_millis(50)).await;
        done.store(true, Ordering::SeqCst);
        let _ = return_task.await;

        let stats = *stats.lock().await;
        Ok(stats)
    }

    fn stop_condition_met(&self, stop: PhaseStop, issued: u64, phase_start: Instant) -> bool {
        match stop {
            PhaseStop::Count(n) => issued >= n,
            PhaseStop::Duration(d) => phase_start.elapsed() >= d,
            PhaseStop::StrategyExhaustion => false,
        }
    }
}

async fn wait_until_done(done: &AtomicBool) {
    loop {
        if done.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn record_return(stats: &Mutex<CreditPhaseStats>, credit_return: &CreditReturn) {
    let mut stats = stats.lock().await;
    stats.returned += 1;
    if credit_return.had_error {
        stats.errored += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::ConcurrencyStrategy;

    #[tokio::test]
    async fn issues_exactly_the_requested_count() {
        let bus = LocalBus::new();
        let strategy: Arc<dyn CreditStrategy> = Arc::new(ConcurrencyStrategy::new(4));
        let scheduler = Scheduler::new(bus.clone(), strategy, "timing_manager".to_string(), None, 30.0, 0.0, 0.0, None);

        let drops = bus.pull_queue(CREDIT_QUEUE).await;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn({
            let cancel_flag = cancel_flag.clone();
            async move { scheduler.run_phase(CreditPhase::Profiling, PhaseStop::Count(3), 1, &cancel_flag).await }
        });

        let mut seen = 0;
        for _ in 0..3 {
            drops.pull().await.unwrap();
            seen += 1;
        }
        assert_eq!(seen, 3);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.issued, 3);
    }

    #[tokio::test]
    async fn cancel_flag_stops_issuing_before_count_is_reached() {
        let bus = LocalBus::new();
        let strategy: Arc<dyn CreditStrategy> = Arc::new(ConcurrencyStrategy::new(4));
        let scheduler = Scheduler::new(bus.clone(), strategy, "timing_manager".to_string(), None, 30.0, 0.0, 0.0, None);

        let drops = bus.pull_queue(CREDIT_QUEUE).await;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn({
            let cancel_flag = cancel_flag.clone();
            async move { scheduler.run_phase(CreditPhase::Profiling, PhaseStop::Count(1_000_000), 1, &cancel_flag).await }
        });

        drops.pull().await.unwrap();
        cancel_flag.store(true, Ordering::SeqCst);

        let stats = handle.await.unwrap().unwrap();
        assert!(stats.issued < 1_000_000);
    }
}
