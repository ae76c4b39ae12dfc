//! Trait seams implemented by `aiperf-providers` and consumed by the worker
//! and scheduler crates. Kept in `aiperf-core` so both sides of the seam can
//! depend on the trait without depending on each other.

use async_trait::async_trait;

use crate::error::AIPerfResult;
use crate::models::Conversation;

/// Supplies the conversations a run draws its requests from. Implementations
/// range from a fixed synthetic dataset to a file-backed custom dataset.
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    /// Total number of distinct conversations available. The scheduler uses
    /// this to cycle through the dataset for `--request-count` runs that
    /// exceed the dataset size.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the conversation at `index`, wrapping modulo `len()`.
    async fn get(&self, index: usize) -> AIPerfResult<Conversation>;
}

/// Counts tokens in generated/received text. Implementations range from a
/// whitespace heuristic to a real tokenizer loaded from a HuggingFace
/// tokenizer.json.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> u32;

    fn name(&self) -> &str;
}

/// A single chunk of a streamed or non-streamed inference response, as
/// delivered over the wire by [`InferenceClient::send`], before any
/// endpoint-specific parsing.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub perf_ns: u64,
    pub bytes: Vec<u8>,
    pub is_final: bool,
}

/// Issues inference requests against a configured endpoint and streams back
/// [`RawChunk`]s as they arrive.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn send(
        &self,
        body: serde_json::Value,
        on_chunk: &mut (dyn FnMut(RawChunk) + Send),
    ) -> AIPerfResult<()>;
}

/// Turns the raw bytes an [`InferenceClient`] received into endpoint-shaped
/// [`crate::models::ParsedResponse`]s. One implementation per
/// [`crate::enums::EndpointType`] (chat, completions, embeddings, ...) lives
/// in `aiperf-parsers`; the worker is generic over this trait so it never
/// needs to know the wire format it is driving.
pub trait ResponseExtractor: Send + Sync {
    /// Builds a request body for the turn at `turns.last()`, given the
    /// configured model name and whether streaming was requested. `turns`
    /// carries the full conversation so far (prior user turns plus the
    /// assistant turns threaded back in by the worker between requests);
    /// conversational endpoints (chat) fold the whole history into the
    /// request, single-shot endpoints look only at the last turn.
    fn build_request(&self, model: &str, turns: &[crate::models::Turn], streaming: bool) -> serde_json::Value;

    /// Parses the raw chunks accumulated over one request into a
    /// [`crate::models::ParsedResponseRecord`]. Implementations must
    /// preserve `perf_ns` ordering from the input chunks.
    fn extract(&self, chunks: &[RawChunk]) -> crate::models::ParsedResponseRecord;
}
