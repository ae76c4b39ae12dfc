//! Bootstraps a [`UserConfig`]/[`ServiceConfig`] pair into a running
//! profiling session and drives it to completion.
//!
//! Transliterates `BaseService`'s state machine in the reference
//! implementation's `services/base_service.py`:
//! `Unknown -> Initializing -> Ready` on `bootstrap`, `Ready -> Starting ->
//! Running` on `run_profile`, `Running -> Stopping -> Stopped` once both
//! credit phases are drained. `ON_INIT`/`ON_START`/`ON_STOP` hooks run at
//! the matching transition, same order as registered.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{info, warn};

use aiperf_bus::LocalBus;
use aiperf_core::config::{ServiceConfig, UserConfig};
use aiperf_core::enums::{CreditPhase, ExportLevel, MessageType, ServiceState, ServiceType, TimingMode};
use aiperf_core::error::{AIPerfError, AIPerfResult};
use aiperf_core::hooks::{HookKind, HookRegistry};
use aiperf_core::models::{Conversation, CreditPhaseStats, Message, MessagePayload, ProfileResults, RealtimeMetricSnapshot};
use aiperf_core::providers::{ConversationProvider, Tokenizer};
use aiperf_providers::{build_synthetic_conversations, HttpInferenceClient, SelectionMode, StaticConversationProvider, WhitespaceTokenizer};
use aiperf_records::{BufferedJsonlWriter, RecordsManager, RecordsManagerConfig};
use aiperf_scheduler::{ConcurrencyStrategy, CreditStrategy, FixedScheduleStrategy, PhaseStop, RateStrategy, Scheduler};
use aiperf_telemetry::{PrometheusTextTelemetryCollector, TelemetryCollector};
use aiperf_worker::WorkerPool;

/// Grace window between aborting the worker pool and signalling the
/// records manager to stop, so request records published just before the
/// abort have a chance to be pulled off the queue rather than discarded.
/// Best-effort: `LocalBus` doesn't expose queue depth, so this is a fixed
/// sleep rather than an exact drain.
const STOP_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Outcome of one full profiling session: the aggregated results plus the
/// per-phase credit issue/return/error counts.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub warmup: Option<CreditPhaseStats>,
    pub profiling: CreditPhaseStats,
    pub results: ProfileResults,
}

pub struct Controller {
    user_config: UserConfig,
    service_config: ServiceConfig,
    bus: LocalBus,
    hooks: HookRegistry,
    state: ServiceState,
    /// The conversation set the most recent `run_profile` drove workers
    /// against, retained so `inputs.json` can be reconstructed afterward
    /// without threading submitted payloads back through the bus.
    conversations: Vec<Conversation>,
    /// Flipped by [`Controller::cancel`] and observed by the in-flight
    /// `Scheduler::run_phase` loop, so cancellation actually halts credit
    /// issuing rather than only running the stop hooks.
    cancel_flag: Arc<AtomicBool>,
}

impl Controller {
    pub fn new(user_config: UserConfig, service_config: ServiceConfig) -> Self {
        Self {
            user_config,
            service_config,
            bus: LocalBus::new(),
            hooks: HookRegistry::new(),
            state: ServiceState::Unknown,
            conversations: Vec::new(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Runs `ON_INIT` hooks and transitions `Unknown -> Initializing ->
    /// Ready`. Must be called once before [`Controller::run_profile`].
    pub async fn bootstrap(&mut self) -> AIPerfResult<()> {
        if self.state != ServiceState::Unknown {
            return Err(AIPerfError::InvalidState {
                service_type: aiperf_core::enums::ServiceType::Controller,
                service_id: "controller".to_string(),
                message: format!("bootstrap requires Unknown state, found {:?}", self.state),
            });
        }
        self.state = ServiceState::Initializing;
        if let Err(err) = self.hooks.run(HookKind::Init).await {
            self.state = ServiceState::Error;
            return Err(err);
        }
        self.state = ServiceState::Ready;
        info!("controller bootstrapped");
        Ok(())
    }

    /// Runs one full profiling session: builds the provider/client/worker
    /// collaborators, runs an optional warmup phase, runs the profiling
    /// phase, drains, and returns the aggregated [`ProfileResults`]. Does
    /// not write export artifacts - call [`crate::export::write_artifacts`]
    /// with the returned outcome for that.
    pub async fn run_profile(&mut self) -> AIPerfResult<RunOutcome> {
        if self.state != ServiceState::Ready {
            return Err(AIPerfError::InvalidState {
                service_type: aiperf_core::enums::ServiceType::Controller,
                service_id: "controller".to_string(),
                message: format!("run_profile requires Ready state, found {:?}", self.state),
            });
        }
        self.state = ServiceState::Starting;

        let tokenizer: Arc<dyn Tokenizer> = match &self.user_config.tokenizer.name {
            Some(name) => Arc::new(WhitespaceTokenizer::new(name.clone())),
            None => Arc::new(WhitespaceTokenizer::default()),
        };

        let conversations = build_synthetic_conversations(&self.user_config.dataset);
        let conversation_count = conversations.len();
        self.conversations = conversations.clone();
        let conversations: Arc<dyn ConversationProvider> = Arc::new(StaticConversationProvider::new(
            conversations,
            SelectionMode::Sequential,
            self.user_config.dataset.random_seed,
        ));

        let inference_client = Arc::new(HttpInferenceClient::new(
            self.user_config.endpoint.url.clone(),
            self.user_config.endpoint.api_key.clone(),
            self.user_config.endpoint.extra_headers.clone(),
            self.user_config.endpoint.request_timeout_sec,
        )?);

        let extractor = aiperf_parsers::for_endpoint(self.user_config.endpoint.endpoint_type, None);

        let jsonl_writer = self.build_jsonl_writer().await?;

        let records_config = RecordsManagerConfig {
            expected_records: self.user_config.timing.request_count,
            percentiles: self.user_config.output.percentiles.clone(),
            ..Default::default()
        };
        let manager = RecordsManager::new(
            self.bus.clone(),
            "records_manager",
            tokenizer,
            aiperf_metrics::default_processors(),
            jsonl_writer,
            records_config,
        );

        let run_start_ns = aiperf_core::time::wall_ns();
        let run_start_perf_ns = aiperf_core::time::perf_ns();
        let (stop_tx, stop_rx) = oneshot::channel();
        let manager_handle = tokio::spawn(manager.run(run_start_perf_ns, stop_rx));

        let worker_pool = WorkerPool::spawn(
            self.service_config.worker_count,
            self.bus.clone(),
            conversations,
            inference_client,
            extractor,
            self.user_config.endpoint.model.clone(),
            self.user_config.endpoint.streaming,
            Duration::from_secs(self.service_config.heartbeat_interval_sec),
        );

        let telemetry_samples: Arc<tokio::sync::Mutex<Vec<RealtimeMetricSnapshot>>> = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let telemetry_handle = self.build_telemetry_task(telemetry_samples.clone())?;

        let strategy = self.build_strategy()?;
        self.cancel_flag.store(false, Ordering::SeqCst);
        let scheduler = Scheduler::new(
            self.bus.clone(),
            strategy,
            "timing_manager".to_string(),
            self.user_config.timing.benchmark_duration_sec,
            self.user_config.timing.benchmark_grace_period_sec,
            self.user_config.timing.request_cancellation_rate,
            self.user_config.timing.request_cancellation_delay_sec,
            self.user_config.dataset.random_seed,
        );

        if let Err(err) = self.hooks.run(HookKind::Start).await {
            worker_pool.abort_all();
            if let Some(handle) = &telemetry_handle {
                handle.abort();
            }
            let _ = stop_tx.send(());
            let _ = manager_handle.await;
            self.state = ServiceState::Error;
            return Err(err);
        }
        self.state = ServiceState::Running;

        let warmup = if self.user_config.timing.warmup_request_count > 0 {
            info!(count = self.user_config.timing.warmup_request_count, "running warmup phase");
            Some(
                scheduler
                    .run_phase(
                        CreditPhase::Warmup,
                        PhaseStop::Count(self.user_config.timing.warmup_request_count),
                        conversation_count,
                        &self.cancel_flag,
                    )
                    .await?,
            )
        } else {
            None
        };

        let stop = self.resolve_profiling_stop()?;
        info!("running profiling phase");
        let profiling = scheduler.run_phase(CreditPhase::Profiling, stop, conversation_count, &self.cancel_flag).await?;

        self.state = ServiceState::Stopping;
        if let Err(err) = self.hooks.run(HookKind::Stop).await {
            warn!(%err, "stop hook failed, continuing shutdown");
        }

        worker_pool.abort_all();
        if let Some(handle) = &telemetry_handle {
            handle.abort();
        }
        tokio::time::sleep(STOP_DRAIN_GRACE).await;
        let _ = stop_tx.send(());

        let mut results = manager_handle
            .await
            .map_err(|e| AIPerfError::comms(format!("records manager task panicked: {e}")))??;

        results.start_ns = run_start_ns;
        results.end_ns = aiperf_core::time::wall_ns();
        results.was_cancelled = self.cancel_flag.load(Ordering::SeqCst);
        results.telemetry_data = telemetry_samples.lock().await.clone();

        self.state = ServiceState::Stopped;
        info!(request_count = results.request_count, error_count = results.error_count, "profiling run complete");

        Ok(RunOutcome { warmup, profiling, results })
    }

    /// Aborts a running session early. Only valid from `Running`; leaves
    /// the controller in `Stopped` with no results to export.
    pub async fn cancel(&mut self) -> AIPerfResult<()> {
        if self.state != ServiceState::Running {
            return Err(AIPerfError::InvalidState {
                service_type: aiperf_core::enums::ServiceType::Controller,
                service_id: "controller".to_string(),
                message: format!("cancel requires Running state, found {:?}", self.state),
            });
        }
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.state = ServiceState::Stopping;
        let _ = self.hooks.run(HookKind::Stop).await;
        self.state = ServiceState::Stopped;
        Ok(())
    }

    async fn build_jsonl_writer(&self) -> AIPerfResult<Option<Arc<BufferedJsonlWriter>>> {
        let filename = match self.user_config.output.export_level {
            ExportLevel::Summary => return Ok(None),
            ExportLevel::Records => "profile_export.jsonl",
            ExportLevel::Raw => "profile_export_raw.jsonl",
        };
        let path = self.user_config.output.artifact_dir.join(filename);
        let writer = BufferedJsonlWriter::create(&path, 100)
            .await
            .map_err(|e| AIPerfError::comms(format!("failed to open {}: {e}", path.display())))?;
        Ok(Some(Arc::new(writer)))
    }

    /// Spawns a task polling the configured GPU telemetry endpoint on its
    /// own interval and publishing each round as `RealtimeTelemetryMetrics`,
    /// the same way a real GPU collector runs alongside the benchmark
    /// rather than being part of the credit/record pipeline itself. Returns
    /// `None` when no telemetry endpoint is configured.
    fn build_telemetry_task(&self, accumulated: Arc<tokio::sync::Mutex<Vec<RealtimeMetricSnapshot>>>) -> AIPerfResult<Option<tokio::task::JoinHandle<()>>> {
        let Some(endpoint_url) = self.user_config.telemetry.endpoint_url.clone() else {
            return Ok(None);
        };

        let extra_fields = match &self.user_config.telemetry.custom_metrics_file {
            Some(path) => aiperf_telemetry::load_custom_metrics_file(path)
                .map_err(|e| AIPerfError::configuration(format!("failed to load custom telemetry metrics {}: {e}", path.display())))?,
            None => Vec::new(),
        };

        let collector = PrometheusTextTelemetryCollector::new(endpoint_url, extra_fields);
        let bus = self.bus.clone();
        let interval = Duration::from_secs_f64(self.user_config.telemetry.collection_interval_sec.max(0.01));

        Ok(Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match collector.collect().await {
                    Ok(samples) => {
                        let snapshots = telemetry_samples_to_snapshots(samples);
                        if !snapshots.is_empty() {
                            accumulated.lock().await.extend(snapshots.iter().cloned());
                        }
                        publish_snapshots(&bus, snapshots);
                    }
                    Err(err) => warn!(%err, "telemetry collection round failed"),
                }
            }
        })))
    }

    fn build_strategy(&self) -> AIPerfResult<Arc<dyn CreditStrategy>> {
        let timing = &self.user_config.timing;
        match timing.effective_mode() {
            TimingMode::FixedSchedule => {
                let path = timing.fixed_schedule_file.as_ref().expect("checked by effective_mode");
                let offsets = load_fixed_schedule_offsets(path)?;
                Ok(Arc::new(FixedScheduleStrategy::new(offsets)))
            }
            TimingMode::Concurrency => {
                let concurrency = timing.concurrency.unwrap_or(1).max(1) as usize;
                Ok(Arc::new(ConcurrencyStrategy::new(concurrency)))
            }
            TimingMode::Rate => {
                let rate = timing.request_rate.ok_or_else(|| AIPerfError::configuration("rate mode requires request_rate"))?;
                Ok(Arc::new(RateStrategy::new(rate, timing.rate_mode, self.user_config.dataset.random_seed)))
            }
        }
    }

    fn resolve_profiling_stop(&self) -> AIPerfResult<PhaseStop> {
        let timing = &self.user_config.timing;
        if let Some(count) = timing.request_count {
            return Ok(PhaseStop::Count(count));
        }
        if timing.effective_mode() == TimingMode::FixedSchedule {
            return Ok(PhaseStop::StrategyExhaustion);
        }
        if let Some(duration) = timing.benchmark_duration_sec {
            return Ok(PhaseStop::Duration(Duration::from_secs_f64(duration)));
        }
        Err(AIPerfError::configuration(
            "profiling phase needs one of request_count, benchmark_duration_sec, or a fixed_schedule_file",
        ))
    }

    pub fn user_config(&self) -> &UserConfig {
        &self.user_config
    }

    pub fn service_config(&self) -> &ServiceConfig {
        &self.service_config
    }
}

#[derive(Debug, Deserialize)]
struct FixedScheduleEntry {
    timestamp_ns: u64,
    #[serde(default)]
    #[allow(dead_code)]
    conversation_id: Option<String>,
}

/// Parses a fixed-schedule trace file: one JSON object per line,
/// `{"timestamp_ns": ..., "conversation_id": ...}`, sorted by the caller
/// (`FixedScheduleStrategy::new` sorts again defensively).
fn load_fixed_schedule_offsets(path: &Path) -> AIPerfResult<Vec<u64>> {
    let content = std::fs::read_to_string(path).map_err(|e| AIPerfError::configuration(format!("failed to read fixed schedule file {}: {e}", path.display())))?;

    let mut offsets = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: FixedScheduleEntry =
            serde_json::from_str(line).map_err(|e| AIPerfError::configuration(format!("{}:{}: {e}", path.display(), line_no + 1)))?;
        offsets.push(entry.timestamp_ns);
    }
    Ok(offsets)
}

/// Maps one telemetry scrape round's GPU/field readings onto the same
/// `RealtimeMetricSnapshot` shape the records manager uses for
/// request-metric snapshots, tagged `gpu{index}_{field}` so a dashboard can
/// split by GPU.
fn telemetry_samples_to_snapshots(samples: Vec<aiperf_telemetry::GpuMetricSample>) -> Vec<RealtimeMetricSnapshot> {
    samples
        .into_iter()
        .map(|sample| RealtimeMetricSnapshot {
            tag: format!("gpu{}_{}", sample.gpu_index, sample.internal_name),
            count: 1,
            avg: sample.value,
            min: sample.value,
            max: sample.value,
        })
        .collect()
}

/// Publishes one telemetry scrape round as `RealtimeTelemetryMetrics`.
fn publish_snapshots(bus: &LocalBus, snapshots: Vec<RealtimeMetricSnapshot>) {
    if snapshots.is_empty() {
        return;
    }
    bus.publish(Message {
        message_type: MessageType::RealtimeTelemetryMetrics,
        service_type: ServiceType::TelemetryCollector,
        service_id: "telemetry_collector".to_string(),
        payload: MessagePayload::RealtimeTelemetryMetrics(snapshots),
    });
}

/// Reconstructs the turn-level request bodies the run would submit, for
/// the reproducibility-tested `inputs.json` artifact. Built from the same
/// conversation set `run_profile` drives workers against, run through the
/// same extractor, rather than threaded back from the workers themselves.
pub fn submitted_turns(
    conversations: &[Conversation],
    extractor: &dyn aiperf_core::providers::ResponseExtractor,
    model: &str,
    streaming: bool,
) -> aiperf_export::InputsRecord {
    let mut inputs = aiperf_export::InputsRecord::new();
    for conversation in conversations {
        for turn_index in 0..conversation.turns.len() {
            let history = &conversation.turns[..=turn_index];
            inputs.record(conversation, turn_index, extractor.build_request(model, history, streaming));
        }
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config(url: String) -> UserConfig {
        let mut config = UserConfig::default();
        config.endpoint.url = url;
        config.endpoint.model = "test-model".to_string();
        config.endpoint.streaming = false;
        config.endpoint.request_timeout_sec = 5;
        config.timing.concurrency = Some(2);
        config.timing.request_count = Some(4);
        config.dataset.synthetic_conversations = 2;
        config.dataset.synthetic_turns_per_conversation = 1;
        config.output.export_level = ExportLevel::Summary;
        config
    }

    #[tokio::test]
    async fn bootstrap_then_run_profile_requires_ready_state() {
        let user = minimal_config("http://127.0.0.1:0".to_string());
        let service = ServiceConfig::default();
        let mut controller = Controller::new(user, service);

        assert!(controller.run_profile().await.is_err(), "run_profile before bootstrap should be rejected");

        controller.bootstrap().await.unwrap();
        assert_eq!(controller.state(), ServiceState::Ready);
    }

    #[tokio::test]
    async fn double_bootstrap_is_rejected() {
        let user = minimal_config("http://127.0.0.1:0".to_string());
        let service = ServiceConfig::default();
        let mut controller = Controller::new(user, service);
        controller.bootstrap().await.unwrap();
        assert!(controller.bootstrap().await.is_err());
    }

    #[test]
    fn resolve_profiling_stop_prefers_request_count() {
        let mut user = UserConfig::default();
        user.timing.request_count = Some(10);
        user.timing.benchmark_duration_sec = Some(30.0);
        let controller = Controller::new(user, ServiceConfig::default());
        assert!(matches!(controller.resolve_profiling_stop().unwrap(), PhaseStop::Count(10)));
    }

    #[test]
    fn resolve_profiling_stop_falls_back_to_duration() {
        let mut user = UserConfig::default();
        user.timing.concurrency = None;
        user.timing.request_rate = Some(5.0);
        user.timing.benchmark_duration_sec = Some(12.0);
        let controller = Controller::new(user, ServiceConfig::default());
        assert!(matches!(controller.resolve_profiling_stop().unwrap(), PhaseStop::Duration(d) if d == Duration::from_secs(12)));
    }

    #[test]
    fn resolve_profiling_stop_errors_with_no_bound() {
        let mut user = UserConfig::default();
        user.timing.concurrency = None;
        user.timing.request_rate = Some(5.0);
        user.timing.benchmark_duration_sec = None;
        let controller = Controller::new(user, ServiceConfig::default());
        assert!(controller.resolve_profiling_stop().is_err());
    }
}
