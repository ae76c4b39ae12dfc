//! The `TelemetryCollector` trait seam: one implementation scrapes a real
//! `dcgm-exporter` endpoint, but the controller only ever depends on the
//! trait, so a test or alternate deployment can substitute a fake collector.

use async_trait::async_trait;

use aiperf_core::error::AIPerfResult;

use crate::dcgm::TelemetryUnit;

/// One GPU telemetry reading: which GPU, which field, its value and unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuMetricSample {
    pub gpu_index: u32,
    pub internal_name: String,
    pub display_name: String,
    pub value: f64,
    pub unit: TelemetryUnit,
}

/// Collects one round of GPU telemetry samples on demand. Implementations
/// are responsible for their own caching/connection reuse; the caller
/// (`aiperf-records`'s realtime loop) calls `collect` on its own interval.
#[async_trait]
pub trait TelemetryCollector: Send + Sync {
    async fn collect(&self) -> AIPerfResult<Vec<GpuMetricSample>>;
}
