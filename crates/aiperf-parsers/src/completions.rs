//! Legacy completions endpoint extractor (`/v1/completions`).
//!
//! Streaming chunks carry `choices[].text` directly (no `delta` wrapper);
//! non-streaming bodies are the same shape as the final streamed chunk.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

use crate::sse::SseParser;

pub struct CompletionsExtractor;

impl ResponseExtractor for CompletionsExtractor {
    fn build_request(&self, model: &str, turns: &[Turn], streaming: bool) -> serde_json::Value {
        let turn = turns.last().expect("at least one turn");
        let prompt: String = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str).collect::<Vec<_>>().join("\n");
        let mut body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": streaming,
        });
        if let Some(max_tokens) = turn.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        if chunks.is_empty() {
            return ParsedResponseRecord::default();
        }
        if chunks.iter().any(|c| c.bytes.windows(5).any(|w| w == b"data:")) {
            extract_streaming(chunks)
        } else {
            extract_non_streaming(chunks)
        }
    }
}

fn extract_streaming(chunks: &[RawChunk]) -> ParsedResponseRecord {
    let mut parser = SseParser::new();
    let mut responses = Vec::new();

    for chunk in chunks {
        parser.feed(&chunk.bytes);
        for event in parser.take_events() {
            if event.data == "[DONE]" {
                responses.push(ParsedResponse {
                    perf_ns: chunk.perf_ns,
                    text: None,
                    usage_output_tokens: None,
                    usage_input_tokens: None,
                    is_final: true,
                });
                continue;
            }
            let Ok(json) = serde_json::from_str::<serde_json::Value>(&event.data) else {
                continue;
            };
            let text = json
                .get("choices")
                .and_then(|c| c.as_array())
                .and_then(|a| a.first())
                .and_then(|choice| choice.get("text"))
                .and_then(|c| c.as_str())
                .map(str::to_string);

            responses.push(ParsedResponse {
                perf_ns: chunk.perf_ns,
                text,
                usage_output_tokens: None,
                usage_input_tokens: None,
                is_final: chunk.is_final,
            });
        }
    }
    if let Some(last) = responses.last_mut() {
        last.is_final = true;
    }
    ParsedResponseRecord { responses }
}

fn extract_non_streaming(chunks: &[RawChunk]) -> ParsedResponseRecord {
    let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
    let perf_ns = chunks.last().map(|c| c.perf_ns).unwrap_or(0);
    let text = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|json| {
            json.get("choices")
                .and_then(|c| c.as_array())
                .and_then(|a| a.first())
                .and_then(|choice| choice.get("text"))
                .and_then(|c| c.as_str())
                .map(str::to_string)
        });

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_non_streaming_text() {
        let extractor = CompletionsExtractor;
        let body = serde_json::json!({ "choices": [{ "text": "hello world" }] });
        let chunks = vec![RawChunk {
            perf_ns: 10,
            bytes: serde_json::to_vec(&body).unwrap(),
            is_final: true,
        }];
        let record = extractor.extract(&chunks);
        assert_eq!(record.responses[0].text.as_deref(), Some("hello world"));
    }
}
