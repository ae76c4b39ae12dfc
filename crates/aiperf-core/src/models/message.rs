//! The envelope every message crossing [`aiperf_bus`] is wrapped in.
//!
//! Grounded on the reference implementation's `BaseServiceMessage`: every
//! message carries its `MessageType` for topic routing plus the sender's
//! identity.

use serde::{Deserialize, Serialize};

use crate::enums::{CreditPhase, MessageType, ServiceId, ServiceType};
use crate::models::credit::{CreditDrop, CreditReturn};
use crate::models::metric::MetricRecord;
use crate::models::record::RequestRecord;

/// The envelope wrapping every payload published on the bus. `message_type`
/// drives topic matching in [`aiperf_bus::topic`]; `payload` is the
/// type-erased body, downcast by the receiving service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_type: MessageType,
    pub service_type: ServiceType,
    pub service_id: ServiceId,
    pub payload: MessagePayload,
}

/// The closed set of payload shapes that can ride inside a [`Message`].
/// A tagged enum rather than `Box<dyn Any>` so every payload survives the
/// bus's JSON (de)serialization round trip intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MessagePayload {
    CreditDrop(CreditDrop),
    CreditReturn(CreditReturn),
    RequestRecord(RequestRecord),
    MetricRecords(Vec<MetricRecord>),
    Registration { service_id: ServiceId, service_type: ServiceType },
    Heartbeat,
    ProgressReport(ProgressReport),
    RealtimeMetrics(Vec<RealtimeMetricSnapshot>),
    RealtimeTelemetryMetrics(Vec<RealtimeMetricSnapshot>),
    ProfileComplete { phase: CreditPhase },
    Error { message: String },
    Empty,
}

/// Periodic credits-and-records progress, published at
/// `DEFAULT_CREDIT_PROGRESS_REPORT_INTERVAL` by the records manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub phase: CreditPhase,
    pub credits_issued: u64,
    pub credits_returned: u64,
    pub records_processed: u64,
}

/// One metric's point-in-time rollup over its realtime window, published at
/// `DEFAULT_REALTIME_METRICS_INTERVAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMetricSnapshot {
    pub tag: String,
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}
