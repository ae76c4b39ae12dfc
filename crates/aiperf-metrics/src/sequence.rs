//! Input/output sequence-length metrics: tokens sent, tokens received, and
//! the error-path counterpart (`error_isl`) that still gets computed when a
//! request failed or was cancelled.

use aiperf_core::models::{Conversation, MetricRecord, RequestRecord};
use aiperf_core::providers::Tokenizer;

use crate::dict;
use crate::processor::RecordProcessor;

fn user_content_tokens(conversation: &Conversation, tokenizer: &dyn Tokenizer) -> u32 {
    conversation
        .turns
        .iter()
        .filter(|turn| turn.role.as_deref().unwrap_or("user") == "user")
        .flat_map(|turn| turn.texts.iter())
        .flat_map(|text| text.contents.iter())
        .map(|content| tokenizer.count_tokens(content))
        .sum()
}

pub struct SequenceLengthProcessor;

impl RecordProcessor for SequenceLengthProcessor {
    fn name(&self) -> &'static str {
        "sequence_length"
    }

    fn process(&self, record: &RequestRecord, tokenizer: &dyn Tokenizer) -> Vec<MetricRecord> {
        let mut out = Vec::new();

        let isl = record.input_conversation.as_ref().map(|c| user_content_tokens(c, tokenizer));

        if record.is_error() {
            if let Some(isl) = record.error_isl.or(isl) {
                out.push(MetricRecord {
                    tag: dict::ERROR_ISL.tag.to_string(),
                    value: isl as f64,
                    unit: dict::ERROR_ISL.unit,
                });
            }
            return out;
        }

        if let Some(isl) = isl {
            out.push(MetricRecord {
                tag: dict::INPUT_SEQUENCE_LENGTH.tag.to_string(),
                value: isl as f64,
                unit: dict::INPUT_SEQUENCE_LENGTH.unit,
            });
        }

        let Some(response) = &record.response else {
            return out;
        };
        let output_text: String = response.responses.iter().filter_map(|r| r.text.as_deref()).collect();
        let osl = response
            .responses
            .last()
            .and_then(|r| r.usage_output_tokens)
            .unwrap_or_else(|| tokenizer.count_tokens(&output_text));

        out.push(MetricRecord {
            tag: dict::OUTPUT_SEQUENCE_LENGTH.tag.to_string(),
            value: osl as f64,
            unit: dict::OUTPUT_SEQUENCE_LENGTH.unit,
        });
        out.push(MetricRecord {
            tag: dict::OUTPUT_TOKEN_COUNT.tag.to_string(),
            value: response.responses.len() as f64,
            unit: dict::OUTPUT_TOKEN_COUNT.unit,
        });

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::CreditPhase;
    use aiperf_core::models::{ErrorDetails, ParsedResponse, ParsedResponseRecord, Text, Turn};
    use uuid::Uuid;

    struct WordTokenizer;
    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> u32 {
            text.split_whitespace().count() as u32
        }
        fn name(&self) -> &str {
            "word"
        }
    }

    fn base_record(conversation: Conversation) -> RequestRecord {
        RequestRecord {
            credit_id: Uuid::new_v4(),
            x_request_id: "r1".to_string(),
            conversation_id: "c1".to_string(),
            turn_index: 0,
            phase: CreditPhase::Profiling,
            credit_num: 0,
            model_name: "test-model".to_string(),
            streaming: false,
            request_start_ns: 0,
            request_start_perf_ns: 0,
            request_end_perf_ns: 10,
            delayed_ns: None,
            request_headers: None,
            input_conversation: Some(conversation),
            response: Some(ParsedResponseRecord {
                responses: vec![ParsedResponse {
                    perf_ns: 10,
                    text: Some("one two three".to_string()),
                    usage_output_tokens: None,
                    usage_input_tokens: None,
                    is_final: true,
                }],
            }),
            error: None,
            was_cancelled: false,
            error_isl: None,
        }
    }

    fn conversation_with_user_text(text: &str) -> Conversation {
        Conversation {
            session_id: "s1".to_string(),
            turns: vec![Turn {
                texts: vec![Text { contents: vec![text.to_string()] }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn computes_isl_and_osl_for_a_successful_record() {
        let record = base_record(conversation_with_user_text("hello there friend"));
        let metrics = SequenceLengthProcessor.process(&record, &WordTokenizer);

        let isl = metrics.iter().find(|m| m.tag == "input_sequence_length").unwrap();
        assert_eq!(isl.value, 3.0);
        let osl = metrics.iter().find(|m| m.tag == "output_sequence_length").unwrap();
        assert_eq!(osl.value, 3.0);
    }

    #[test]
    fn error_record_still_reports_error_isl() {
        let mut record = base_record(conversation_with_user_text("a b c d"));
        record.error = Some(ErrorDetails::new("boom"));
        record.response = None;

        let metrics = SequenceLengthProcessor.process(&record, &WordTokenizer);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].tag, "error_isl");
        assert_eq!(metrics[0].value, 4.0);
    }
}
