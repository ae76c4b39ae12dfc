//! Hugging Face Text Generation Inference `/generate`/`/generate_stream`
//! extractor. Streaming chunks are SSE with a bare JSON `data:` payload
//! shaped `{"token": {"text": "..."}, "generated_text": null | "..."}`.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

use crate::sse::SseParser;

pub struct HuggingfaceGenerateExtractor;

impl ResponseExtractor for HuggingfaceGenerateExtractor {
    fn build_request(&self, _model: &str, turns: &[Turn], streaming: bool) -> serde_json::Value {
        let turn = turns.last().expect("at least one turn");
        let inputs: String = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str).collect::<Vec<_>>().join("\n");
        serde_json::json!({
            "inputs": inputs,
            "stream": streaming,
            "parameters": { "max_new_tokens": turn.max_tokens },
        })
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        if chunks.iter().any(|c| c.bytes.windows(5).any(|w| w == b"data:")) {
            let mut parser = SseParser::new();
            let mut responses = Vec::new();
            for chunk in chunks {
                parser.feed(&chunk.bytes);
                for event in parser.take_events() {
                    let Ok(json) = serde_json::from_str::<serde_json::Value>(&event.data) else {
                        continue;
                    };
                    let text = json
                        .get("token")
                        .and_then(|t| t.get("text"))
                        .and_then(|t| t.as_str())
                        .map(str::to_string);
                    let is_final = json.get("generated_text").map(|g| !g.is_null()).unwrap_or(false);
                    responses.push(ParsedResponse {
                        perf_ns: chunk.perf_ns,
                        text,
                        usage_output_tokens: None,
                        usage_input_tokens: None,
                        is_final,
                    });
                }
            }
            if let Some(last) = responses.last_mut() {
                last.is_final = true;
            }
            ParsedResponseRecord { responses }
        } else {
            let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
            let perf_ns = chunks.last().map(|c| c.perf_ns).unwrap_or(0);
            let text = serde_json::from_slice::<serde_json::Value>(&bytes)
                .ok()
                .and_then(|json| json.get("generated_text").and_then(|g| g.as_str()).map(str::to_string));
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
}
