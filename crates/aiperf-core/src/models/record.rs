//! Records produced by workers and consumed by record processors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::CreditPhase;
use crate::models::conversation::Conversation;
use crate::models::metric::ErrorDetails;

/// One parsed chunk of an inference response: either streaming SSE events or
/// a single non-streaming body, already split into per-turn boundaries by
/// the response extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Perf-clock nanoseconds at which this chunk was received.
    pub perf_ns: u64,
    pub text: Option<String>,
    #[serde(default)]
    pub usage_output_tokens: Option<u32>,
    #[serde(default)]
    pub usage_input_tokens: Option<u32>,
    /// `true` for the terminal chunk of a response (the SSE `[DONE]` marker,
    /// or the only chunk of a non-streaming response).
    pub is_final: bool,
}

/// The full set of parsed responses for one request, in receipt order.
/// Invariant: `perf_ns` is monotonically non-decreasing across this vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedResponseRecord {
    pub responses: Vec<ParsedResponse>,
}

/// Everything the record processor needs to compute one request's metrics:
/// the conversation turn that was sent, the wall/perf timestamps the worker
/// observed, and either the parsed response or the error that replaced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub credit_id: Uuid,
    /// Unique per request, distinct from `x_correlation_id` (the credit
    /// drop's id, shared by every turn of the same conversation).
    pub x_request_id: String,
    pub conversation_id: String,
    pub turn_index: usize,
    pub phase: CreditPhase,
    /// Monotonically increasing within a phase; copied from the owning
    /// `CreditDrop`.
    pub credit_num: u64,
    pub model_name: String,
    /// `true` if this request was sent with `stream: true`; gates
    /// streaming-only metrics (`time_to_first_token`, inter-token/chunk
    /// latency) so a non-streaming request never reports them.
    pub streaming: bool,

    /// Anchor wall-clock time (Unix nanoseconds) corresponding to
    /// `request_start_perf_ns`, used to convert every other `perf_ns`
    /// timestamp on this record into wall-clock time via `compute_time_ns`.
    pub request_start_ns: u64,
    pub request_start_perf_ns: u64,
    pub request_end_perf_ns: u64,
    /// How long, in nanoseconds, the request's start lagged behind its
    /// credit's scheduled drop time. `None` when the request started on
    /// time or the strategy has no schedule to lag behind.
    #[serde(default)]
    pub delayed_ns: Option<u64>,
    #[serde(default)]
    pub request_headers: Option<Vec<(String, String)>>,

    pub input_conversation: Option<Conversation>,
    pub response: Option<ParsedResponseRecord>,
    pub error: Option<ErrorDetails>,
    /// `true` when the request was aborted by the per-request cancellation
    /// timeout. Distinct from `error`: a cancelled request still carries an
    /// `error` (`RequestCancellationError`, code 499) but is tracked
    /// separately so a future cancellation mechanism without an
    /// accompanying error still counts correctly.
    #[serde(default)]
    pub was_cancelled: bool,

    /// Recorded even on error, per invariant: an errored request still
    /// reports however many input tokens it sent.
    pub error_isl: Option<u32>,
}

impl RequestRecord {
    /// A request counts as an error for aggregation purposes if it errored
    /// outright or was cancelled before completion, even when cancellation
    /// itself didn't populate `error`.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.was_cancelled
    }
}
