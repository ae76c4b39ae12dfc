//! The records manager service (C7): consumes `RequestRecord`s and credit
//! traffic off the bus, runs them through the metric processors, maintains
//! running/percentile/realtime aggregators, and emits `ProgressReport`,
//! `RealtimeMetrics`, and a final `ProfileResults` + `error_summary`.
//!
//! Grounded in the reference implementation's `record_processor_service.py`
//! fan-out-then-gather and its records-manager aggregation loop; the queue
//! name below must match `aiperf_worker::worker::REQUEST_RECORD_QUEUE`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aiperf_bus::{LocalBus, Topic};
use aiperf_core::enums::{CreditPhase, MessageType, ServiceType};
use aiperf_core::error::AIPerfResult;
use aiperf_core::models::{Message, MessagePayload, ProfileResults, ProgressReport, RealtimeMetricSnapshot, RequestRecord};
use aiperf_core::providers::Tokenizer;
use aiperf_metrics::processor::RecordProcessor;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::jsonl_writer::BufferedJsonlWriter;
use crate::percentile::ExactPercentiles;
use crate::realtime::RealtimeWindow;

/// Must match `aiperf_worker::worker::REQUEST_RECORD_QUEUE`. Kept as a
/// plain string rather than a cross-crate dependency so the records manager
/// does not need to depend on the worker crate for one constant.
pub const REQUEST_RECORD_QUEUE: &str = "request_records";

pub struct RecordsManagerConfig {
    /// Stop the run after this many records have been processed. `None`
    /// runs until externally stopped.
    pub expected_records: Option<u64>,
    pub progress_interval: Duration,
    pub realtime_interval: Duration,
    pub realtime_window_secs: u64,
    pub percentiles: Vec<u16>,
}

impl Default for RecordsManagerConfig {
    fn default() -> Self {
        Self {
            expected_records: None,
            progress_interval: Duration::from_secs_f64(2.0),
            realtime_interval: Duration::from_secs_f64(5.0),
            realtime_window_secs: 30,
            percentiles: vec![50, 90, 95, 99],
        }
    }
}

/// Key identifying one distinct error shape for `error_summary` grouping:
/// `(request_type, code, message)` structural equality.
type ErrorKey = (Option<String>, Option<i64>, String);

pub struct RecordsManager {
    bus: LocalBus,
    service_id: String,
    tokenizer: Arc<dyn Tokenizer>,
    processors: Vec<Box<dyn RecordProcessor>>,
    jsonl_writer: Option<Arc<BufferedJsonlWriter>>,
    config: RecordsManagerConfig,
}

impl RecordsManager {
    pub fn new(
        bus: LocalBus,
        service_id: impl Into<String>,
        tokenizer: Arc<dyn Tokenizer>,
        processors: Vec<Box<dyn RecordProcessor>>,
        jsonl_writer: Option<Arc<BufferedJsonlWriter>>,
        config: RecordsManagerConfig,
    ) -> Self {
        Self {
            bus,
            service_id: service_id.into(),
            tokenizer,
            processors,
            jsonl_writer,
            config,
        }
    }

    /// Runs the aggregation loop until `expected_records` have been seen
    /// (when set) or `stop` fires, then returns the final `ProfileResults`
    /// and publishes `ProfileComplete`.
    pub async fn run(mut self, run_start_perf_ns: u64, mut stop: oneshot::Receiver<()>) -> AIPerfResult<ProfileResults> {
        let mut credit_drops = self.bus.subscribe(Topic::Any(MessageType::CreditDrop));
        let mut credit_returns = self.bus.subscribe(Topic::Any(MessageType::CreditReturn));
        let records = self.bus.pull_queue(REQUEST_RECORD_QUEUE).await;

        let mut progress_ticker = tokio::time::interval(self.config.progress_interval);
        let mut realtime_ticker = tokio::time::interval(self.config.realtime_interval);

        let mut percentiles: HashMap<String, ExactPercentiles> = HashMap::new();
        let mut realtime = RealtimeWindow::new(self.config.realtime_window_secs);
        let mut error_summary: HashMap<ErrorKey, u64> = HashMap::new();

        let mut credits_issued: u64 = 0;
        let mut credits_returned: u64 = 0;
        let mut records_processed: u64 = 0;
        let mut profiling_processed: u64 = 0;
        let mut error_count: u64 = 0;
        let mut phase = CreditPhase::Profiling;

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break,

                Ok(message) = credit_drops.recv() => {
                    credits_issued += 1;
                    let _ = message;
                }

                Ok(message) = credit_returns.recv() => {
                    credits_returned += 1;
                    let _ = message;
                }

                Ok(message) = records.pull() => {
                    if let MessagePayload::RequestRecord(record) = message.payload {
                        phase = record.phase;
                        self.ingest(&record, &mut percentiles, &mut realtime, &mut error_summary, run_start_perf_ns).await;
                        records_processed += 1;
                        // Warmup records are persisted (inside `ingest`) but never
                        // counted towards aggregation or the expected-count cutoff -
                        // they're excluded from ProfileResults entirely.
                        if record.phase == CreditPhase::Profiling {
                            profiling_processed += 1;
                            if record.is_error() {
                                error_count += 1;
                            }
                        }
                        if let Some(expected) = self.config.expected_records {
                            if profiling_processed >= expected {
                                break;
                            }
                        }
                    }
                }

                _ = progress_ticker.tick() => {
                    self.publish_progress(phase, credits_issued, credits_returned, records_processed);
                }

                _ = realtime_ticker.tick() => {
                    self.publish_realtime(&realtime);
                }
            }
        }

        if let Some(writer) = &self.jsonl_writer {
            writer.flush().await.map_err(|e| aiperf_core::error::AIPerfError::comms(e.to_string()))?;
        }

        let results = self.finalize(percentiles, error_summary, profiling_processed, error_count, run_start_perf_ns);
        self.bus.publish(Message {
            message_type: MessageType::ProfileComplete,
            service_type: ServiceType::RecordsManager,
            service_id: self.service_id.clone(),
            payload: MessagePayload::ProfileComplete { phase },
        });
        Ok(results)
    }

    async fn ingest(
        &self,
        record: &RequestRecord,
        percentiles: &mut HashMap<String, ExactPercentiles>,
        realtime: &mut RealtimeWindow,
        error_summary: &mut HashMap<ErrorKey, u64>,
        run_start_perf_ns: u64,
    ) {
        if let Some(writer) = &self.jsonl_writer {
            if let Err(error) = writer.append(record).await {
                warn!(%error, "failed to persist request record to jsonl");
            }
        }

        if record.phase == CreditPhase::Warmup {
            debug!(credit_id = %record.credit_id, "excluding warmup record from aggregation");
            return;
        }

        let metrics = aiperf_metrics::processor::run_all(&self.processors, record, self.tokenizer.as_ref());

        let elapsed_sec = record.request_start_perf_ns.saturating_sub(run_start_perf_ns) / 1_000_000_000;
        for metric in &metrics {
            if record.is_error() && metric.tag != "error_isl" && metric.tag != "good_request_count" {
                continue;
            }
            percentiles.entry(metric.tag.clone()).or_default().push(metric.value);
            realtime.push(elapsed_sec, &metric.tag, metric.value);
        }

        if let Some(error) = &record.error {
            let key = (error.request_type.clone(), error.code, error.message.clone());
            *error_summary.entry(key).or_insert(0) += 1;
        }

        debug!(credit_id = %record.credit_id, metrics = metrics.len(), "processed request record");
    }

    fn publish_progress(&self, phase: CreditPhase, credits_issued: u64, credits_returned: u64, records_processed: u64) {
        self.bus.publish(Message {
            message_type: MessageType::ProgressReport,
            service_type: ServiceType::RecordsManager,
            service_id: self.service_id.clone(),
            payload: MessagePayload::ProgressReport(ProgressReport {
                phase,
                credits_issued,
                credits_returned,
                records_processed,
            }),
        });
    }

    fn publish_realtime(&self, realtime: &RealtimeWindow) {
        let snapshots: Vec<RealtimeMetricSnapshot> = realtime
            .tags()
            .into_iter()
            .map(|tag| {
                let summary = realtime.summary(&tag);
                RealtimeMetricSnapshot {
                    count: summary.count(),
                    avg: summary.mean(),
                    min: summary.min(),
                    max: summary.max(),
                    tag,
                }
            })
            .collect();

        self.bus.publish(Message {
            message_type: MessageType::RealtimeMetrics,
            service_type: ServiceType::RecordsManager,
            service_id: self.service_id.clone(),
            payload: MessagePayload::RealtimeMetrics(snapshots),
        });
    }

    fn finalize(
        &self,
        mut percentiles: HashMap<String, ExactPercentiles>,
        error_summary: HashMap<ErrorKey, u64>,
        records_processed: u64,
        error_count: u64,
        run_start_perf_ns: u64,
    ) -> ProfileResults {
        let mut metrics = Vec::new();
        for tag in percentiles.keys().cloned().collect::<Vec<_>>() {
            let Some(spec) = aiperf_metrics::dict::spec_for(&tag) else {
                continue;
            };
            let estimator = percentiles.get_mut(&tag).unwrap();
            let scale = spec.unit.display_scale();
            metrics.push(aiperf_core::models::MetricResult {
                tag: spec.tag.to_string(),
                header: spec.header.to_string(),
                unit: spec.unit.display_unit(),
                count: estimator.len() as u64,
                avg: estimator.mean() * scale,
                min: estimator.min().unwrap_or(0.0) * scale,
                max: estimator.max().unwrap_or(0.0) * scale,
                std: estimator.std_dev() * scale,
                percentiles: estimator.percentiles(&self.config.percentiles).into_iter().map(|(r, v)| (r, v * scale)).collect(),
            });
        }
        metrics.sort_by(|a, b| a.tag.cmp(&b.tag));

        let mut error_list: Vec<_> = error_summary.into_iter().collect();
        error_list.sort_by(|a, b| b.1.cmp(&a.1));
        let error_summary: Vec<aiperf_core::models::ErrorSummaryEntry> = error_list
            .into_iter()
            .map(|((request_type, code, message), count)| {
                warn!(request_type = ?request_type, code = ?code, %message, count, "error summary entry");
                aiperf_core::models::ErrorSummaryEntry { request_type, code, message, count }
            })
            .collect();

        let duration_ns = aiperf_core::time::perf_ns().saturating_sub(run_start_perf_ns);
        let duration_sec = duration_ns as f64 / 1_000_000_000.0;

        ProfileResults {
            metrics,
            request_count: records_processed,
            error_count,
            // Overwritten by the controller once the run fully ends: only it
            // knows the wall-clock anchor and whether `Controller::cancel`
            // was called mid-run.
            start_ns: 0,
            end_ns: 0,
            benchmark_duration_sec: duration_sec,
            request_throughput: if duration_sec > 0.0 {
                (records_processed - error_count) as f64 / duration_sec
            } else {
                0.0
            },
            was_cancelled: false,
            error_summary,
            telemetry_data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::CreditPhase;
    use aiperf_core::models::{ParsedResponse, ParsedResponseRecord};
    use uuid::Uuid;

    struct WordTokenizer;
    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> u32 {
            text.split_whitespace().count() as u32
        }
        fn name(&self) -> &str {
            "word"
        }
    }

    fn success_record(end_perf_ns: u64) -> RequestRecord {
        RequestRecord {
            credit_id: Uuid::new_v4(),
            x_request_id: Uuid::new_v4().to_string(),
            conversation_id: "c1".to_string(),
            turn_index: 0,
            phase: CreditPhase::Profiling,
            credit_num: 0,
            model_name: "test-model".to_string(),
            streaming: false,
            request_start_ns: 0,
            request_start_perf_ns: 1_000_000_000,
            request_end_perf_ns: end_perf_ns,
            delayed_ns: None,
            request_headers: None,
            input_conversation: None,
            response: Some(ParsedResponseRecord {
                responses: vec![ParsedResponse {
                    perf_ns: end_perf_ns,
                    text: Some("ok".to_string()),
                    usage_output_tokens: None,
                    usage_input_tokens: None,
                    is_final: true,
                }],
            }),
            error: None,
            was_cancelled: false,
            error_isl: None,
        }
    }

    #[tokio::test]
    async fn stops_after_expected_record_count_and_reports_throughput() {
        let bus = LocalBus::new();
        let manager = RecordsManager::new(
            bus.clone(),
            "rm_1",
            Arc::new(WordTokenizer),
            aiperf_metrics::default_processors(),
            None,
            RecordsManagerConfig {
                expected_records: Some(3),
                progress_interval: Duration::from_secs(60),
                realtime_interval: Duration::from_secs(60),
                ..Default::default()
            },
        );

        let (_stop_tx, stop_rx) = oneshot::channel();
        let run_start = 1_000_000_000u64;

        let handle = tokio::spawn(manager.run(run_start, stop_rx));

        for i in 0..3u64 {
            bus.push(
                REQUEST_RECORD_QUEUE,
                Message {
                    message_type: MessageType::InferenceResults,
                    service_type: ServiceType::Worker,
                    service_id: "worker_1".to_string(),
                    payload: MessagePayload::RequestRecord(success_record(run_start + 1_000_000 + i)),
                },
            )
            .await
            .unwrap();
        }

        let results = handle.await.unwrap().unwrap();
        assert_eq!(results.request_count, 3);
        assert_eq!(results.error_count, 0);
        assert!(results.metrics.iter().any(|m| m.tag == "request_latency"));
    }
}
