//! Chat-completions endpoint extractor (`/v1/chat/completions`).
//!
//! Streaming responses are OpenAI-style SSE: each event's `data:` payload is
//! a JSON chunk with `choices[].delta.content`; a final `data: [DONE]`
//! closes the stream. Non-streaming responses are a single JSON body with
//! `choices[].message.content`.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

use crate::sse::SseParser;

pub struct ChatExtractor;

impl ResponseExtractor for ChatExtractor {
    fn build_request(&self, model: &str, turns: &[Turn], streaming: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|turn| {
                let content: String = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str).collect::<Vec<_>>().join("\n");
                serde_json::json!({
                    "role": turn.role.clone().unwrap_or_else(|| "user".to_string()),
                    "content": content,
                })
            })
            .collect();
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": streaming,
        });
        if let Some(max_tokens) = turns.last().and_then(|t| t.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        if chunks.is_empty() {
            return ParsedResponseRecord::default();
        }

        if looks_like_sse(chunks) {
            extract_streaming(chunks)
        } else {
            extract_non_streaming(chunks)
        }
    }
}

fn looks_like_sse(chunks: &[RawChunk]) -> bool {
    chunks.iter().any(|c| c.bytes.windows(5).any(|w| w == b"data:"))
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
                .and_then(|choice| choice.get("delta"))
                .and_then(|delta| delta.get("content"))
                .and_then(|c| c.as_str())
                .map(str::to_string);
            let usage_output_tokens = json
                .get("usage")
                .and_then(|u| u.get("completion_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32);
            let usage_input_tokens = json
                .get("usage")
                .and_then(|u| u.get("prompt_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32);

            responses.push(ParsedResponse {
                perf_ns: chunk.perf_ns,
                text,
                usage_output_tokens,
                usage_input_tokens,
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

    let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return ParsedResponseRecord {
            responses: vec![ParsedResponse {
                perf_ns,
                text: None,
                usage_output_tokens: None,
                usage_input_tokens: None,
                is_final: true,
            }],
        };
    };

    let text = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string);
    let usage_output_tokens = json
        .get("usage")
        .and_then(|u| u.get("completion_tokens"))
        .and_then(|v| v.as_u64())
        .map(|v| v as u32);
    let usage_input_tokens = json
        .get("usage")
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(|v| v.as_u64())
        .map(|v| v as u32);

    ParsedResponseRecord {
        responses: vec![ParsedResponse {
            perf_ns,
            text,
            usage_output_tokens,
            usage_input_tokens,
            is_final: true,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_streaming_delta_content_in_order() {
        let extractor = ChatExtractor;
        let chunks = vec![
            RawChunk {
                perf_ns: 100,
                bytes: b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n".to_vec(),
                is_final: false,
            },
            RawChunk {
                perf_ns: 200,
                bytes: b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
                is_final: true,
            },
        ];

        let record = extractor.extract(&chunks);
        let text: String = record.responses.iter().filter_map(|r| r.text.clone()).collect();
        assert_eq!(text, "Hello");
        assert!(record.responses.last().unwrap().is_final);
        assert!(record.responses.windows(2).all(|w| w[0].perf_ns <= w[1].perf_ns));
    }

    #[test]
    fn extracts_non_streaming_message_content() {
        let extractor = ChatExtractor;
        let body = serde_json::json!({
            "choices": [{ "message": { "content": "hi there" } }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 2 }
        });
        let chunks = vec![RawChunk {
            perf_ns: 50,
            bytes: serde_json::to_vec(&body).unwrap(),
            is_final: true,
        }];

        let record = extractor.extract(&chunks);
        assert_eq!(record.responses.len(), 1);
        assert_eq!(record.responses[0].text.as_deref(), Some("hi there"));
        assert_eq!(record.responses[0].usage_output_tokens, Some(2));
    }
}
