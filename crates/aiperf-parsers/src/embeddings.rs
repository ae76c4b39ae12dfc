//! Embeddings endpoint extractor (`/v1/embeddings`). Always non-streaming:
//! the response is a single JSON body with one vector per input.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

pub struct EmbeddingsExtractor;

impl ResponseExtractor for EmbeddingsExtractor {
    fn build_request(&self, model: &str, turns: &[Turn], _streaming: bool) -> serde_json::Value {
        let turn = turns.last().expect("at least one turn");
        let input: Vec<&str> = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str).collect();
        serde_json::json!({
            "model": model,
            "input": input,
        })
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
        let perf_ns = chunks.last().map(|c| c.perf_ns).unwrap_or(0);

        let usage_input_tokens = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|json| json.get("usage").and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_u64()))
            .map(|v| v as u32);

        ParsedResponseRecord {
            responses: vec![ParsedResponse {
                perf_ns,
                text: None,
                usage_output_tokens: None,
                usage_input_tokens,
                is_final: true,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_usage_from_embeddings_body() {
        let extractor = EmbeddingsExtractor;
        let body = serde_json::json!({ "data": [{"embedding": [0.1, 0.2]}], "usage": { "prompt_tokens": 8 } });
        let chunks = vec![RawChunk {
            perf_ns: 1,
            bytes: serde_json::to_vec(&body).unwrap(),
            is_final: true,
        }];
        let record = extractor.extract(&chunks);
        assert_eq!(record.responses[0].usage_input_tokens, Some(8));
    }
}
