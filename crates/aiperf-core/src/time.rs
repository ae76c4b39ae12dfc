//! Monotonic-clock helpers.
//!
//! AIPerf timestamps two clocks per record: a wall-clock Unix-nanosecond
//! anchor (for human-readable export) and a monotonic perf-clock nanosecond
//! reading (for ordering and duration math, immune to clock adjustment).
//! Every other timestamp on a record is expressed as a perf-clock reading
//! and converted back to wall-clock only at export time via
//! [`compute_time_ns`].

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Process-wide monotonic clock origin, established once on first use so
/// that `perf_ns()` readings are comparable across the whole run.
static PERF_CLOCK_ORIGIN: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Current monotonic perf-clock reading, in nanoseconds since this process's
/// clock origin.
pub fn perf_ns() -> u64 {
    let origin = PERF_CLOCK_ORIGIN.get_or_init(Instant::now);
    origin.elapsed().as_nanos() as u64
}

/// Current wall-clock reading, in nanoseconds since the Unix epoch.
pub fn wall_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as u64
}

/// Converts a perf-clock reading into wall-clock nanoseconds, given an
/// anchor pair taken at (approximately) the same instant.
///
/// `compute_time_ns(anchor_ns, anchor_perf_ns, target_perf_ns) = anchor_ns +
/// (target_perf_ns - anchor_perf_ns)`. `target_perf_ns` may be before or
/// after the anchor; the subtraction is signed to allow both.
pub fn compute_time_ns(anchor_ns: u64, anchor_perf_ns: u64, target_perf_ns: u64) -> u64 {
    let delta = target_perf_ns as i128 - anchor_perf_ns as i128;
    (anchor_ns as i128 + delta) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_time_ns_forward_and_backward() {
        assert_eq!(compute_time_ns(1_000_000, 500, 600), 1_000_100);
        assert_eq!(compute_time_ns(1_000_000, 500, 400), 999_900);
        assert_eq!(compute_time_ns(1_000_000, 500, 500), 1_000_000);
    }

    #[test]
    fn perf_ns_is_monotonic() {
        let a = perf_ns();
        let b = perf_ns();
        assert!(b >= a);
    }
}
