//! AIPerf - load generation and measurement harness for LLM inference
//! endpoints.
//!
//! Drives a configured workload against an OpenAI-compatible endpoint,
//! collects per-request and streaming-token timings, and writes summary/CSV/
//! JSONL artifacts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use aiperf_controller::Controller;
use aiperf_core::config::{ConfigLoader, ServiceConfig, UserConfig};
use aiperf_core::enums::{EndpointType, ExportLevel, RateMode};

#[derive(Parser)]
#[command(name = "aiperf")]
#[command(author = "AIPerf Contributors")]
#[command(version)]
#[command(about = "Load-generation and measurement harness for LLM inference endpoints", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AIPERF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a profiling session against an inference endpoint
    Profile {
        /// Endpoint URL
        #[arg(short = 'u', long)]
        url: Option<String>,

        /// Endpoint wire format (chat, completions, embeddings, rankings,
        /// huggingface_generate, templated)
        #[arg(long)]
        endpoint_type: Option<String>,

        /// Model name sent in each request body
        #[arg(short, long)]
        model: Option<String>,

        /// Request the endpoint stream its response
        #[arg(long)]
        streaming: bool,

        /// Fixed in-flight request count (concurrency strategy)
        #[arg(long)]
        concurrency: Option<u32>,

        /// Requests issued per second (rate strategy)
        #[arg(long)]
        request_rate: Option<f64>,

        /// Inter-arrival distribution for rate mode (poisson, constant)
        #[arg(long, default_value = "poisson")]
        rate_mode: String,

        /// Total profiling requests to issue
        #[arg(long)]
        request_count: Option<u64>,

        /// Requests to issue before profiling starts, excluded from results
        #[arg(long, default_value = "0")]
        warmup_request_count: u64,

        /// Wall-clock seconds to run the profiling phase
        #[arg(long)]
        benchmark_duration: Option<f64>,

        /// Path to a fixed-schedule input trace (overrides concurrency/rate)
        #[arg(long)]
        fixed_schedule_file: Option<PathBuf>,

        /// Fraction of requests to cancel mid-flight, in [0.0, 1.0]
        #[arg(long)]
        request_cancellation_rate: Option<f64>,

        /// Seconds to wait before cancelling a request drawn for cancellation
        #[arg(long)]
        request_cancellation_delay: Option<f64>,

        /// Number of synthetic conversations to generate
        #[arg(long)]
        synthetic_conversations: Option<usize>,

        /// Turns per synthetic conversation
        #[arg(long)]
        synthetic_turns: Option<usize>,

        /// Deterministic seed for dataset selection and rate sampling
        #[arg(long)]
        random_seed: Option<u64>,

        /// Directory to write export artifacts to
        #[arg(short, long)]
        artifact_dir: Option<PathBuf>,

        /// How much of the pipeline output to export (summary, records, raw)
        #[arg(long, default_value = "records")]
        export_level: String,

        /// Number of worker tasks driving requests concurrently
        #[arg(long)]
        worker_count: Option<usize>,

        /// GPU telemetry endpoint (dcgm-exporter-shaped Prometheus text)
        #[arg(long)]
        telemetry_url: Option<String>,
    },

    /// Validate a configuration file (or the default-resolved config) without running
    ValidateConfig,

    /// Print the default-resolved configuration as TOML
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Profile {
            url,
            endpoint_type,
            model,
            streaming,
            concurrency,
            request_rate,
            rate_mode,
            request_count,
            warmup_request_count,
            benchmark_duration,
            fixed_schedule_file,
            request_cancellation_rate,
            request_cancellation_delay,
            synthetic_conversations,
            synthetic_turns,
            random_seed,
            artifact_dir,
            export_level,
            worker_count,
            telemetry_url,
        } => {
            let (mut user, mut service) = load_config(cli.config.clone());

            if let Some(url) = url {
                user.endpoint.url = url;
            }
            if let Some(endpoint_type) = endpoint_type {
                user.endpoint.endpoint_type = parse_endpoint_type(&endpoint_type)?;
            }
            if let Some(model) = model {
                user.endpoint.model = model;
            }
            if streaming {
                user.endpoint.streaming = true;
            }
            if concurrency.is_some() {
                user.timing.concurrency = concurrency;
            }
            if request_rate.is_some() {
                user.timing.request_rate = request_rate;
                user.timing.concurrency = None;
            }
            user.timing.rate_mode = parse_rate_mode(&rate_mode)?;
            if request_count.is_some() {
                user.timing.request_count = request_count;
            }
            user.timing.warmup_request_count = warmup_request_count;
            if benchmark_duration.is_some() {
                user.timing.benchmark_duration_sec = benchmark_duration;
            }
            if fixed_schedule_file.is_some() {
                user.timing.fixed_schedule_file = fixed_schedule_file;
            }
            if let Some(rate) = request_cancellation_rate {
                user.timing.request_cancellation_rate = rate;
            }
            if let Some(delay) = request_cancellation_delay {
                user.timing.request_cancellation_delay_sec = delay;
            }
            if let Some(n) = synthetic_conversations {
                user.dataset.synthetic_conversations = n;
            }
            if let Some(n) = synthetic_turns {
                user.dataset.synthetic_turns_per_conversation = n;
            }
            if random_seed.is_some() {
                user.dataset.random_seed = random_seed;
            }
            if let Some(dir) = artifact_dir {
                user.output.artifact_dir = dir;
            }
            user.output.export_level = parse_export_level(&export_level)?;
            if let Some(n) = worker_count {
                service.worker_count = n;
            }
            if telemetry_url.is_some() {
                user.telemetry.endpoint_url = telemetry_url;
            }

            profile_command(user, service).await
        }
        Commands::ValidateConfig => validate_config_command(cli.config.clone()),
        Commands::ShowConfig => show_config_command(cli.config.clone()),
    }
}

/// Loads configuration from file/env, with fallback to defaults.
fn load_config(cli_path: Option<PathBuf>) -> (UserConfig, ServiceConfig) {
    let loader = ConfigLoader::new().with_cli_path(cli_path);
    match loader.load() {
        Ok((user, service)) => {
            info!("configuration loaded successfully");
            (user, service)
        }
        Err(e) => {
            warn!("failed to load configuration: {e}, using defaults");
            (UserConfig::default(), ServiceConfig::default())
        }
    }
}

fn parse_endpoint_type(value: &str) -> anyhow::Result<EndpointType> {
    match value.to_lowercase().as_str() {
        "chat" => Ok(EndpointType::Chat),
        "completions" => Ok(EndpointType::Completions),
        "embeddings" => Ok(EndpointType::Embeddings),
        "rankings" => Ok(EndpointType::Rankings),
        "huggingface_generate" => Ok(EndpointType::HuggingfaceGenerate),
        "templated" => Ok(EndpointType::Templated),
        other => anyhow::bail!("unknown endpoint type: {other}"),
    }
}

fn parse_rate_mode(value: &str) -> anyhow::Result<RateMode> {
    match value.to_lowercase().as_str() {
        "poisson" => Ok(RateMode::Poisson),
        "constant" => Ok(RateMode::Constant),
        other => anyhow::bail!("unknown rate mode: {other}"),
    }
}

fn parse_export_level(value: &str) -> anyhow::Result<ExportLevel> {
    match value.to_lowercase().as_str() {
        "summary" => Ok(ExportLevel::Summary),
        "records" => Ok(ExportLevel::Records),
        "raw" => Ok(ExportLevel::Raw),
        other => anyhow::bail!("unknown export level: {other}"),
    }
}

/// Runs one profiling session end to end: bootstrap, run, export, report.
/// Exit codes follow the CLI convention: 0 success, 1 error, 130 on Ctrl-C.
async fn profile_command(user: UserConfig, service: ServiceConfig) -> anyhow::Result<()> {
    info!(url = %user.endpoint.url, model = %user.endpoint.model, "starting aiperf profiling run");

    let mut controller = Controller::new(user, service);
    let started_at_ns = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;

    let run = async {
        controller.bootstrap().await?;
        controller.run_profile().await
    };

    let outcome = tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("received Ctrl-C, cancelling run");
            controller.cancel().await.ok();
            std::process::exit(130);
        }
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%err, "profiling run failed");
            std::process::exit(1);
        }
    };

    let ended_at_ns = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;

    if let Err(err) = aiperf_controller::write_artifacts(&controller, &outcome, started_at_ns, ended_at_ns).await {
        error!(%err, "failed to write export artifacts");
        std::process::exit(1);
    }

    info!(
        request_count = outcome.results.request_count,
        error_count = outcome.results.error_count,
        throughput = outcome.results.request_throughput,
        "profiling run complete"
    );

    Ok(())
}

fn validate_config_command(cli_path: Option<PathBuf>) -> anyhow::Result<()> {
    match ConfigLoader::new().with_cli_path(cli_path).load() {
        Ok((user, service)) => {
            println!("configuration is valid");
            println!("endpoint: {} ({:?})", user.endpoint.url, user.endpoint.endpoint_type);
            println!("worker_count: {}", service.worker_count);
            Ok(())
        }
        Err(err) => {
            eprintln!("configuration is invalid: {err}");
            std::process::exit(1);
        }
    }
}

fn show_config_command(cli_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (user, service) = load_config(cli_path);
    #[derive(serde::Serialize)]
    struct ConfigFile {
        user: UserConfig,
        service: ServiceConfig,
    }
    let file = ConfigFile { user, service };
    println!("{}", toml::to_string_pretty(&file)?);
    Ok(())
}
