//! Request-rate pacing: issue credits at a target rate, inter-arrival times
//! drawn from a Poisson process or spaced at a constant interval.
//!
//! Grounded on `RequestRateStrategy`/`concurrency_strategy.py`'s Poisson
//! sampling in the reference implementation, which draws inter-arrival
//! gaps from an exponential distribution with rate `request_rate` so the
//! issuing process is a genuine Poisson process rather than jittered
//! constant spacing.

use async_trait::async_trait;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::Distribution;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use aiperf_core::RateMode;

use crate::strategy::{CreditStrategy, CreditTiming};

pub struct RateStrategy {
    mode: RateMode,
    /// Mean inter-arrival interval, i.e. `1 / request_rate` seconds.
    mean_interval_sec: f64,
    rng: Mutex<StdRng>,
    issued_once: AtomicBool,
}

impl RateStrategy {
    pub fn new(request_rate: f64, mode: RateMode, seed: Option<u64>) -> Self {
        assert!(request_rate > 0.0, "request_rate must be positive");
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode,
            mean_interval_sec: 1.0 / request_rate,
            rng: Mutex::new(rng),
            issued_once: AtomicBool::new(false),
        }
    }

    fn sample_interval_sec(&self, rng: &mut StdRng) -> f64 {
        match self.mode {
            RateMode::Constant => self.mean_interval_sec,
            RateMode::Poisson => {
                let lambda = 1.0 / self.mean_interval_sec;
                let exp = rand_distr::Exp::new(lambda).expect("rate must be positive");
                exp.sample(rng)
            }
        }
    }
}

#[async_trait]
impl CreditStrategy for RateStrategy {
    async fn wait_slot(&self) -> Option<CreditTiming> {
        if !self.issued_once.swap(true, Ordering::SeqCst) {
            return Some(CreditTiming::default());
        }
        let interval_sec = {
            let mut rng = self.rng.lock().await;
            self.sample_interval_sec(&mut rng)
        };
        tokio::time::sleep(Duration::from_secs_f64(interval_sec.max(0.0))).await;
        Some(CreditTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_credit_issues_without_delay() {
        let strategy = RateStrategy::new(1.0, RateMode::Constant, Some(1));
        let start = tokio::time::Instant::now();
        strategy.wait_slot().await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn constant_mode_spaces_by_exact_interval() {
        let strategy = RateStrategy::new(10.0, RateMode::Constant, Some(1));
        strategy.wait_slot().await.unwrap();

        let start = tokio::time::Instant::now();
        strategy.wait_slot().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn poisson_mode_draws_varying_intervals() {
        let strategy = RateStrategy::new(1000.0, RateMode::Poisson, Some(42));
        strategy.wait_slot().await.unwrap();
        strategy.wait_slot().await.unwrap();
        strategy.wait_slot().await.unwrap();
    }
}
