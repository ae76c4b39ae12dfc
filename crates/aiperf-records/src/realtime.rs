//! Windowed realtime aggregation: keeps only the last `window_secs` worth of
//! values per metric tag, bucketed by elapsed whole seconds since the run
//! started, for the dashboard-facing `RealtimeMetrics` message.

use std::collections::{HashMap, VecDeque};

use crate::running_summary::RunningSummary;

#[derive(Debug, Default)]
struct Bucket {
    elapsed_sec: u64,
    values: HashMap<String, Vec<f64>>,
}

/// A ring of per-second buckets; buckets older than `window_secs` are
/// dropped on every `push`, so memory is bounded by `window_secs * distinct
/// tags per second`, not by run length.
pub struct RealtimeWindow {
    window_secs: u64,
    buckets: VecDeque<Bucket>,
}

impl RealtimeWindow {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            buckets: VecDeque::new(),
        }
    }

    pub fn push(&mut self, elapsed_sec: u64, tag: &str, value: f64) {
        if self.buckets.back().map(|b| b.elapsed_sec) != Some(elapsed_sec) {
            self.buckets.push_back(Bucket {
                elapsed_sec,
                values: HashMap::new(),
            });
        }
        self.buckets.back_mut().unwrap().values.entry(tag.to_string()).or_default().push(value);
        self.evict_before(elapsed_sec.saturating_sub(self.window_secs));
    }

    fn evict_before(&mut self, cutoff: u64) {
        while self.buckets.front().map(|b| b.elapsed_sec < cutoff).unwrap_or(false) {
            self.buckets.pop_front();
        }
    }

    /// A `RunningSummary` over every value currently retained for `tag`.
    pub fn summary(&self, tag: &str) -> RunningSummary {
        let mut summary = RunningSummary::new();
        for bucket in &self.buckets {
            if let Some(values) = bucket.values.get(tag) {
                for &value in values {
                    summary.push(value);
                }
            }
        }
        summary
    }

    pub fn tags(&self) -> Vec<String> {
        let mut seen: Vec<String> = self.buckets.iter().flat_map(|b| b.values.keys().cloned()).collect();
        seen.sort();
        seen.dedup();
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_values_outside_the_window() {
        let mut window = RealtimeWindow::new(5);
        window.push(0, "lat", 10.0);
        window.push(3, "lat", 20.0);
        window.push(10, "lat", 30.0);

        let summary = window.summary("lat");
        assert_eq!(summary.count(), 1);
        assert_eq!(summary.mean(), 30.0);
    }

    #[test]
    fn tracks_multiple_tags_independently() {
        let mut window = RealtimeWindow::new(10);
        window.push(0, "a", 1.0);
        window.push(0, "b", 2.0);
        assert_eq!(window.summary("a").count(), 1);
        assert_eq!(window.summary("b").count(), 1);
        assert_eq!(window.tags(), vec!["a".to_string(), "b".to_string()]);
    }
}
