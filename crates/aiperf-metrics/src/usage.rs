//! Server-reported `usage` token counts, preferred over client-side counting
//! when present on the final response chunk.

use aiperf_core::models::{MetricRecord, RequestRecord};
use aiperf_core::providers::Tokenizer;

use crate::dict;
use crate::processor::RecordProcessor;

pub struct UsageProcessor;

impl RecordProcessor for UsageProcessor {
    fn name(&self) -> &'static str {
        "usage"
    }

    fn process(&self, record: &RequestRecord, _tokenizer: &dyn Tokenizer) -> Vec<MetricRecord> {
        let Some(response) = &record.response else {
            return Vec::new();
        };
        let Some(last) = response.responses.last() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        if let Some(prompt_tokens) = last.usage_input_tokens {
            out.push(MetricRecord {
                tag: dict::USAGE_PROMPT_TOKENS.tag.to_string(),
                value: prompt_tokens as f64,
                unit: dict::USAGE_PROMPT_TOKENS.unit,
            });
        }
        if let Some(completion_tokens) = last.usage_output_tokens {
            out.push(MetricRecord {
                tag: dict::USAGE_COMPLETION_TOKENS.tag.to_string(),
                value: completion_tokens as f64,
                unit: dict::USAGE_COMPLETION_TOKENS.unit,
            });
        }
        if let (Some(prompt), Some(completion)) = (last.usage_input_tokens, last.usage_output_tokens) {
            out.push(MetricRecord {
                tag: dict::USAGE_TOTAL_TOKENS.tag.to_string(),
                value: (prompt + completion) as f64,
                unit: dict::USAGE_TOTAL_TOKENS.unit,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::CreditPhase;
    use aiperf_core::models::{ParsedResponse, ParsedResponseRecord};
    use uuid::Uuid;

    struct NullTokenizer;
    impl Tokenizer for NullTokenizer {
        fn count_tokens(&self, _text: &str) -> u32 {
            0
        }
        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn emits_total_only_when_both_usage_fields_present() {
        let record = RequestRecord {
            credit_id: Uuid::new_v4(),
            x_request_id: Uuid::new_v4().to_string(),
            conversation_id: "c1".to_string(),
            turn_index: 0,
            phase: CreditPhase::Profiling,
            credit_num: 0,
            model_name: "test-model".to_string(),
            streaming: false,
            request_start_ns: 0,
            request_start_perf_ns: 0,
            request_end_perf_ns: 1,
            delayed_ns: None,
            request_headers: None,
            input_conversation: None,
            response: Some(ParsedResponseRecord {
                responses: vec![ParsedResponse {
                    perf_ns: 1,
                    text: None,
                    usage_output_tokens: Some(12),
                    usage_input_tokens: Some(8),
                    is_final: true,
                }],
            }),
            error: None,
            was_cancelled: false,
            error_isl: None,
        };
        let metrics = UsageProcessor.process(&record, &NullTokenizer);
        let total = metrics.iter().find(|m| m.tag == "usage_total_tokens").unwrap();
        assert_eq!(total.value, 20.0);
    }
}
