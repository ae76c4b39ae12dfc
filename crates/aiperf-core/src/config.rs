//! Configuration system for AIPerf.
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - [`UserConfig`] (the benchmark the user asked for) and [`ServiceConfig`]
//!   (how the services that run it are wired together)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::enums::{EndpointType, ExportLevel, RateMode, TimingMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// The benchmark a user asked to run: endpoint, dataset, timing strategy,
/// and output settings. Everything here is serializable to/from TOML and
/// overridable by CLI flags or `AIPERF_*` environment variables, with CLI
/// taking precedence over env, which takes precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub endpoint: EndpointSettings,
    pub dataset: DatasetSettings,
    pub timing: TimingSettings,
    pub output: OutputSettings,
    pub tokenizer: TokenizerSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub url: String,
    pub endpoint_type: EndpointType,
    pub model: String,
    pub streaming: bool,
    /// Wall-clock seconds to wait for a single request before it is treated
    /// as an error.
    pub request_timeout_sec: u64,
    pub api_key: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            endpoint_type: EndpointType::Chat,
            model: String::new(),
            streaming: true,
            request_timeout_sec: 600,
            api_key: None,
            extra_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Path to a custom input dataset file; `None` selects the built-in
    /// synthetic provider.
    pub input_file: Option<PathBuf>,
    pub synthetic_conversations: usize,
    pub synthetic_turns_per_conversation: usize,
    pub synthetic_input_tokens_mean: u32,
    pub synthetic_input_tokens_stddev: u32,
    pub synthetic_output_tokens_mean: u32,
    pub synthetic_output_tokens_stddev: u32,
    pub random_seed: Option<u64>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            input_file: None,
            synthetic_conversations: 1,
            synthetic_turns_per_conversation: 1,
            synthetic_input_tokens_mean: 550,
            synthetic_input_tokens_stddev: 0,
            synthetic_output_tokens_mean: 150,
            synthetic_output_tokens_stddev: 0,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub mode: TimingMode,
    pub rate_mode: RateMode,
    /// Fixed in-flight request count (`concurrency` mode).
    pub concurrency: Option<u32>,
    /// Requests issued per second (`rate` mode).
    pub request_rate: Option<f64>,
    /// Total profiling requests to issue; `None` means "drain the dataset
    /// once" for fixed-schedule mode, or "run until duration" otherwise.
    pub request_count: Option<u64>,
    pub warmup_request_count: u64,
    /// Wall-clock seconds to run the profiling phase; mutually exclusive
    /// with `request_count` validation-wise, but either may be set.
    pub benchmark_duration_sec: Option<f64>,
    /// Grace period after `benchmark_duration_sec` elapses before in-flight
    /// requests are force-cancelled.
    pub benchmark_grace_period_sec: f64,
    /// Path to a fixed-schedule input trace; presence forces `mode` to
    /// `FixedSchedule` regardless of the configured value.
    pub fixed_schedule_file: Option<PathBuf>,
    /// Fraction, in `[0.0, 1.0]`, of issued credits that are drawn for
    /// per-request cancellation (distinct from `benchmark_grace_period_sec`,
    /// which cancels everything still in flight once the run's duration
    /// bound passes).
    pub request_cancellation_rate: f64,
    /// Delay, in seconds, after which a request drawn for cancellation has
    /// its in-flight inference call aborted.
    pub request_cancellation_delay_sec: f64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            mode: TimingMode::Concurrency,
            rate_mode: RateMode::Poisson,
            concurrency: Some(1),
            request_rate: None,
            request_count: None,
            warmup_request_count: 0,
            benchmark_duration_sec: None,
            benchmark_grace_period_sec: 30.0,
            fixed_schedule_file: None,
            request_cancellation_rate: 0.0,
            request_cancellation_delay_sec: 0.0,
        }
    }
}

impl TimingSettings {
    /// Resolves the effective strategy per the precedence in the module
    /// doc: a fixed-schedule file always wins, then an explicit
    /// `--concurrency`, otherwise request-rate.
    pub fn effective_mode(&self) -> TimingMode {
        if self.fixed_schedule_file.is_some() {
            TimingMode::FixedSchedule
        } else if self.concurrency.is_some() {
            TimingMode::Concurrency
        } else {
            TimingMode::Rate
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub artifact_dir: PathBuf,
    pub export_level: ExportLevel,
    pub percentiles: Vec<u16>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            export_level: ExportLevel::Records,
            percentiles: vec![50, 90, 95, 99],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    /// `None` selects the whitespace-heuristic tokenizer.
    pub name: Option<String>,
    pub trust_remote_code: bool,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            name: None,
            trust_remote_code: false,
        }
    }
}

/// GPU telemetry scraping, alongside the benchmark rather than part of it:
/// a `dcgm-exporter`-shaped endpoint polled on its own interval, optionally
/// extended with custom metrics read from a CSV file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// `None` disables telemetry collection entirely.
    pub endpoint_url: Option<String>,
    pub collection_interval_sec: f64,
    pub custom_metrics_file: Option<PathBuf>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            collection_interval_sec: 1.0,
            custom_metrics_file: None,
        }
    }
}

/// How the services carrying out a [`UserConfig`]'s benchmark are wired
/// together: worker pool size, bus addressing, and service-level timeouts.
/// Distinct from `UserConfig` because it describes the run's execution
/// topology, not the benchmark itself - two runs with identical
/// `UserConfig`s might use different `ServiceConfig`s (e.g. worker count)
/// without changing what is measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
    pub worker_count: usize,
    pub command_timeout_sec: u64,
    pub heartbeat_interval_sec: u64,
    pub record_processor_count: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_count: num_cpus_heuristic(),
            command_timeout_sec: 30,
            heartbeat_interval_sec: 5,
            record_processor_count: 1,
        }
    }
}

fn num_cpus_heuristic() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Loads, overrides, and validates a [`UserConfig`] + [`ServiceConfig`]
/// pair. Mirrors the precedence the reference implementation's CLI config
/// loader applies: CLI flag > environment variable > config file > default.
pub struct ConfigLoader {
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI `--config` flag
    /// 2. `AIPERF_CONFIG` environment variable
    /// 3. `~/.config/aiperf/config.toml`
    /// 4. Default values
    pub fn load(&self) -> ConfigResult<(UserConfig, ServiceConfig)> {
        let config_path = self.find_config_file();

        let (mut user, mut service) = if let Some(path) = config_path {
            info!("Loading configuration from: {}", path.display());
            self.load_from_file(&path)?
        } else {
            debug!("No config file found, using defaults");
            (UserConfig::default(), ServiceConfig::default())
        };

        self.apply_env_overrides(&mut user, &mut service);
        self.validate(&user, &service)?;

        Ok((user, service))
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("CLI config path does not exist: {}", path.display());
        }

        if let Ok(env_path) = std::env::var("AIPERF_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!("AIPERF_CONFIG path does not exist: {}", env_path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("aiperf").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn load_from_file(&self, path: &Path) -> ConfigResult<(UserConfig, ServiceConfig)> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok((file.user, file.service))
    }

    fn apply_env_overrides(&self, user: &mut UserConfig, service: &mut ServiceConfig) {
        if let Ok(val) = std::env::var("AIPERF_LOG_LEVEL") {
            service.log_level = val;
        }
        if let Ok(val) = std::env::var("AIPERF_WORKER_COUNT") {
            if let Ok(n) = val.parse() {
                service.worker_count = n;
            }
        }

        if let Ok(val) = std::env::var("AIPERF_ENDPOINT_URL") {
            user.endpoint.url = val;
        }
        if let Ok(val) = std::env::var("AIPERF_MODEL") {
            user.endpoint.model = val;
        }
        if let Ok(val) = std::env::var("AIPERF_API_KEY") {
            user.endpoint.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("AIPERF_STREAMING") {
            user.endpoint.streaming = val.parse().unwrap_or(user.endpoint.streaming);
        }

        if let Ok(val) = std::env::var("AIPERF_CONCURRENCY") {
            user.timing.concurrency = val.parse().ok();
        }
        if let Ok(val) = std::env::var("AIPERF_REQUEST_RATE") {
            user.timing.request_rate = val.parse().ok();
        }
        if let Ok(val) = std::env::var("AIPERF_REQUEST_COUNT") {
            user.timing.request_count = val.parse().ok();
        }
        if let Ok(val) = std::env::var("AIPERF_REQUEST_CANCELLATION_RATE") {
            if let Ok(rate) = val.parse() {
                user.timing.request_cancellation_rate = rate;
            }
        }
        if let Ok(val) = std::env::var("AIPERF_REQUEST_CANCELLATION_DELAY") {
            if let Ok(delay) = val.parse() {
                user.timing.request_cancellation_delay_sec = delay;
            }
        }

        if let Ok(val) = std::env::var("AIPERF_ARTIFACT_DIR") {
            user.output.artifact_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("AIPERF_TELEMETRY_URL") {
            user.telemetry.endpoint_url = Some(val);
        }
    }

    fn validate(&self, user: &UserConfig, service: &ServiceConfig) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&service.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "invalid log level: {}. must be one of: {:?}",
                service.log_level, valid_levels
            )));
        }

        if user.endpoint.url.is_empty() {
            return Err(ConfigError::ValidationError("endpoint.url must not be empty".to_string()));
        }

        if service.worker_count == 0 {
            return Err(ConfigError::ValidationError("worker_count must be at least 1".to_string()));
        }

        match user.timing.effective_mode() {
            TimingMode::Concurrency => {
                if user.timing.concurrency.map(|c| c == 0).unwrap_or(true) {
                    return Err(ConfigError::ValidationError(
                        "concurrency mode requires concurrency >= 1".to_string(),
                    ));
                }
            }
            TimingMode::Rate => {
                if user.timing.request_rate.map(|r| r <= 0.0).unwrap_or(true) {
                    return Err(ConfigError::ValidationError(
                        "rate mode requires request_rate > 0".to_string(),
                    ));
                }
            }
            TimingMode::FixedSchedule => {
                let path = user.timing.fixed_schedule_file.as_ref().expect("checked by effective_mode");
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
            }
        }

        if user.output.percentiles.iter().any(|p| *p == 0 || *p >= 100) {
            return Err(ConfigError::ValidationError(
                "percentiles must be in (0, 100)".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&user.timing.request_cancellation_rate) {
            return Err(ConfigError::ValidationError(
                "request_cancellation_rate must be in [0.0, 1.0]".to_string(),
            ));
        }

        Ok(())
    }

    pub fn save(&self, user: &UserConfig, service: &ServiceConfig, path: &Path) -> ConfigResult<()> {
        let file = ConfigFile {
            user: user.clone(),
            service: service.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| ConfigError::ValidationError(format!("failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("aiperf").join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    user: UserConfig,
    service: ServiceConfig,
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_concurrency_mode() {
        let user = UserConfig::default();
        assert_eq!(user.timing.effective_mode(), TimingMode::Concurrency);
        assert_eq!(user.timing.concurrency, Some(1));
    }

    #[test]
    fn fixed_schedule_file_overrides_concurrency() {
        let mut user = UserConfig::default();
        user.timing.fixed_schedule_file = Some(PathBuf::from("/tmp/trace.jsonl"));
        assert_eq!(user.timing.effective_mode(), TimingMode::FixedSchedule);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
            [user.endpoint]
            url = "http://localhost:9000"
            model = "my-model"
        "#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.user.endpoint.url, "http://localhost:9000");
        assert_eq!(file.user.endpoint.model, "my-model");
        assert!(file.user.endpoint.streaming);
    }

    #[test]
    fn validation_rejects_empty_endpoint() {
        let mut user = UserConfig::default();
        user.endpoint.url = String::new();
        let service = ServiceConfig::default();
        let loader = ConfigLoader::new();
        assert!(loader.validate(&user, &service).is_err());
    }

    #[test]
    fn validation_rejects_zero_concurrency() {
        let mut user = UserConfig::default();
        user.timing.concurrency = Some(0);
        let service = ServiceConfig::default();
        let loader = ConfigLoader::new();
        assert!(loader.validate(&user, &service).is_err());
    }

    #[test]
    fn validation_rejects_bad_percentile() {
        let mut user = UserConfig::default();
        user.output.percentiles = vec![50, 100];
        let service = ServiceConfig::default();
        let loader = ConfigLoader::new();
        assert!(loader.validate(&user, &service).is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let user = UserConfig::default();
        let service = ServiceConfig::default();
        let file = ConfigFile { user, service };
        let toml_str = toml::to_string_pretty(&file).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.user.endpoint.url, file.user.endpoint.url);
        assert_eq!(parsed.service.worker_count, file.service.worker_count);
    }
}
