//! A generic extractor for custom/unrecognized endpoints: the request body
//! is built from a user-supplied template string with `{{prompt}}`
//! substitution, and the response is captured verbatim with no field
//! extraction - used when none of the named endpoint types fit.

use aiperf_core::models::{ParsedResponse, ParsedResponseRecord, Turn};
use aiperf_core::providers::{RawChunk, ResponseExtractor};

pub struct TemplatedExtractor {
    pub template: String,
}

impl ResponseExtractor for TemplatedExtractor {
    fn build_request(&self, model: &str, turns: &[Turn], _streaming: bool) -> serde_json::Value {
        let turn = turns.last().expect("at least one turn");
        let prompt: String = turn.texts.iter().flat_map(|t| t.contents.iter()).map(String::as_str).collect::<Vec<_>>().join("\n");
        let rendered = self.template.replace("{{prompt}}", &prompt).replace("{{model}}", model);
        serde_json::from_str(&rendered).unwrap_or_else(|_| serde_json::json!({ "model": model, "prompt": prompt }))
    }

    fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.bytes.iter().copied()).collect();
        let perf_ns = chunks.last().map(|c| c.perf_ns).unwrap_or(0);
        ParsedResponseRecord {
            responses: vec![ParsedResponse {
                perf_ns,
                text: String::from_utf8(bytes).ok(),
                usage_output_tokens: None,
                usage_input_tokens: None,
                is_final: true,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_prompt_and_model_into_template() {
        let extractor = TemplatedExtractor {
            template: r#"{"model": "{{model}}", "inputs": "{{prompt}}"}"#.to_string(),
        };
        let turn = Turn {
            texts: vec![aiperf_core::models::Text { contents: vec!["hi".to_string()] }],
            ..Default::default()
        };
        let body = extractor.build_request("m1", std::slice::from_ref(&turn), false);
        assert_eq!(body["model"], "m1");
        assert_eq!(body["inputs"], "hi");
    }
}
