//! Rankings/reranking endpoint extractor. Non-streaming: a query plus a
//! list of candidate passages in, a relevance-ordered score list out.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

pub struct RankingsExtractor;

impl ResponseExtractor for RankingsExtractor {
    fn build_request(&self, model: &str, turns: &[Turn], _streaming: bool) -> serde_json::Value {
        let turn = turns.last().expect("at least one turn");
        let mut texts = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str);
        let query = texts.next().unwrap_or_default();
        let passages: Vec<&str> = texts.collect();
        serde_json::json!({
            "model": model,
            "query": { "text": query },
            "passages": passages.into_iter().map(|p| serde_json::json!({ "text": p })).collect::<Vec<_>>(),
        })
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
        let perf_ns = chunks.last().map(|c| c.perf_ns).unwrap_or(0);
        let text = String::from_utf8(bytes).ok();

        ParsedResponseRecord {
            responses: vec![ParsedResponse {
                perf_ns,
                text,
                usage_output_tokens: None,
                usage_input_tokens: None,
                is_final: true,
            }],
        }
    }
}
