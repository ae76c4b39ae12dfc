//! Per-request cancellation: draws a random subset of issued credits to be
//! cancelled after a fixed delay, exercising `--request-cancellation-rate`/
//! `--request-cancellation-delay`.
//!
//! Grounded on `_send_with_optional_cancel` in the reference
//! implementation's `workers/worker.py`, which treats `cancel_after_ns` as a
//! relative delay (`timeout_s = cancel_after_ns / NANOS_PER_SECOND` fed
//! straight into `asyncio.wait_for`) rather than an absolute deadline - the
//! opposite of `crate::cancellation`'s phase-duration cutoff. Uses the same
//! seeded-`StdRng` idiom as `RateStrategy` so a seeded run draws the same
//! cancelled requests every time.

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::Mutex;

/// Draws whether one credit should be cancelled, given the configured
/// cancellation rate in `[0.0, 1.0]`.
pub struct RequestCancellationDraw {
    rate: f64,
    delay_ns: u64,
    rng: Mutex<StdRng>,
}

impl RequestCancellationDraw {
    pub fn new(rate: f64, delay_sec: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rate: rate.clamp(0.0, 1.0),
            delay_ns: (delay_sec.max(0.0) * 1_000_000_000.0) as u64,
            rng: Mutex::new(rng),
        }
    }

    /// Returns `(should_cancel, cancel_after_ns)` for the next credit. When
    /// the configured rate is `0.0` the RNG is never touched, so a run with
    /// cancellation disabled draws identically to one without this feature
    /// at all.
    pub async fn draw(&self) -> (bool, u64) {
        if self.rate <= 0.0 {
            return (false, 0);
        }
        let should_cancel = self.rng.lock().await.gen_bool(self.rate);
        (should_cancel, self.delay_ns)
    }
}
