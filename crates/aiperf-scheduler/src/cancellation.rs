//! Duration-based cutoff stamping for in-flight requests.
//!
//! When a run is bounded by `benchmark_duration_sec` rather than
//! `request_count`, credits issued near the end of the window still need a
//! deadline so a slow/hanging request doesn't extend the run indefinitely.
//! Each credit is stamped with `phase_deadline_perf_ns`; the worker treats
//! the whole credit as cancelled once `perf_ns() >= phase_deadline_perf_ns`,
//! after the grace period has also elapsed. This is distinct from
//! per-request cancellation (`crate::request_cancellation`), which draws a
//! random subset of requests to cancel after a configured delay regardless
//! of how much of the run's duration remains.

/// Computes the perf-clock deadline a newly-issued credit should carry,
/// given the run's start time and its configured duration + grace period.
/// Returns `None` when the run has no duration bound (count-based runs
/// never cancel for time).
pub fn phase_deadline_perf_ns(run_start_perf_ns: u64, benchmark_duration_sec: Option<f64>, grace_period_sec: f64) -> Option<u64> {
    let duration_sec = benchmark_duration_sec?;
    let total_sec = duration_sec + grace_period_sec.max(0.0);
    let total_ns = (total_sec * 1_000_000_000.0) as u64;
    Some(run_start_perf_ns + total_ns)
}

/// Whether a credit carrying `phase_deadline_perf_ns` should be cancelled
/// given the current perf-clock reading.
pub fn deadline_passed(phase_deadline_perf_ns: Option<u64>, now_perf_ns: u64) -> bool {
    matches!(phase_deadline_perf_ns, Some(deadline) if now_perf_ns >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_duration_never_cancels() {
        assert_eq!(phase_deadline_perf_ns(0, None, 30.0), None);
        assert!(!deadline_passed(None, u64::MAX));
    }

    #[test]
    fn deadline_includes_grace_period() {
        let deadline = phase_deadline_perf_ns(1_000_000_000, Some(10.0), 5.0).unwrap();
        assert_eq!(deadline, 1_000_000_000 + 15_000_000_000);
    }

    #[test]
    fn deadline_passed_flips_at_deadline() {
        let deadline = Some(100);
        assert!(!deadline_passed(deadline, 99));
        assert!(deadline_passed(deadline, 100));
        assert!(deadline_passed(deadline, 101));
    }
}
