//! Request-level and streaming-chunk latency metrics.

use aiperf_core::models::{MetricRecord, RequestRecord};
use aiperf_core::providers::Tokenizer;

use crate::dict;
use crate::processor::RecordProcessor;

pub struct LatencyProcessor;

impl RecordProcessor for LatencyProcessor {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn process(&self, record: &RequestRecord, _tokenizer: &dyn Tokenizer) -> Vec<MetricRecord> {
        let mut out = Vec::new();

        out.push(MetricRecord {
            tag: dict::REQUEST_LATENCY.tag.to_string(),
            value: record.request_end_perf_ns.saturating_sub(record.request_start_perf_ns) as f64,
            unit: dict::REQUEST_LATENCY.unit,
        });

        let Some(response) = &record.response else {
            return out;
        };
        let chunks = &response.responses;
        if chunks.is_empty() || !record.streaming {
            return out;
        }

        let first_chunk_ns = chunks[0].perf_ns;
        out.push(MetricRecord {
            tag: dict::TIME_TO_FIRST_TOKEN.tag.to_string(),
            value: first_chunk_ns.saturating_sub(record.request_start_perf_ns) as f64,
            unit: dict::TIME_TO_FIRST_TOKEN.unit,
        });

        if chunks.len() < 2 {
            return out;
        }

        out.push(MetricRecord {
            tag: dict::TIME_TO_SECOND_TOKEN.tag.to_string(),
            value: chunks[1].perf_ns.saturating_sub(chunks[0].perf_ns) as f64,
            unit: dict::TIME_TO_SECOND_TOKEN.unit,
        });

        let inter_chunk: Vec<f64> = chunks
            .windows(2)
            .map(|pair| pair[1].perf_ns.saturating_sub(pair[0].perf_ns) as f64)
            .collect();
        for delta in &inter_chunk {
            out.push(MetricRecord {
                tag: dict::INTER_CHUNK_LATENCY.tag.to_string(),
                value: *delta,
                unit: dict::INTER_CHUNK_LATENCY.unit,
            });
        }

        let output_token_count = chunks
            .last()
            .and_then(|c| c.usage_output_tokens)
            .unwrap_or(chunks.len() as u32);
        if output_token_count > 1 {
            let span = record.request_end_perf_ns.saturating_sub(first_chunk_ns) as f64;
            out.push(MetricRecord {
                tag: dict::INTER_TOKEN_LATENCY.tag.to_string(),
                value: span / (output_token_count - 1) as f64,
                unit: dict::INTER_TOKEN_LATENCY.unit,
            });
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::CreditPhase;
    use aiperf_core::models::ParsedResponse;
    use aiperf_core::models::ParsedResponseRecord;
    use uuid::Uuid;

    struct FakeTokenizer;
    impl Tokenizer for FakeTokenizer {
        fn count_tokens(&self, text: &str) -> u32 {
            text.split_whitespace().count() as u32
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    fn record_with_chunks(chunks: Vec<u64>) -> RequestRecord {
        record_with_chunks_streaming(chunks, true)
    }

    fn record_with_chunks_streaming(chunks: Vec<u64>, streaming: bool) -> RequestRecord {
        RequestRecord {
            credit_id: Uuid::new_v4(),
            x_request_id: Uuid::new_v4().to_string(),
            conversation_id: "c1".to_string(),
            turn_index: 0,
            phase: CreditPhase::Profiling,
            credit_num: 0,
            model_name: "test-model".to_string(),
            streaming,
            request_start_ns: 0,
            request_start_perf_ns: 1_000,
            request_end_perf_ns: chunks.last().copied().unwrap_or(1_000),
            delayed_ns: None,
            request_headers: None,
            input_conversation: None,
            response: Some(ParsedResponseRecord {
                responses: chunks
                    .into_iter()
                    .map(|perf_ns| ParsedResponse {
                        perf_ns,
                        text: Some("a".to_string()),
                        usage_output_tokens: None,
                        usage_input_tokens: None,
                        is_final: false,
                    })
                    .collect(),
            }),
            error: None,
            was_cancelled: false,
            error_isl: None,
        }
    }

    #[test]
    fn computes_ttft_and_inter_chunk_latencies() {
        let record = record_with_chunks(vec![1_100, 1_250, 1_400]);
        let metrics = LatencyProcessor.process(&record, &FakeTokenizer);

        let ttft = metrics.iter().find(|m| m.tag == "time_to_first_token").unwrap();
        assert_eq!(ttft.value, 100.0);

        let inter_chunk: Vec<f64> = metrics.iter().filter(|m| m.tag == "inter_chunk_latency").map(|m| m.value).collect();
        assert_eq!(inter_chunk, vec![150.0, 150.0]);
    }

    #[test]
    fn single_chunk_response_has_no_ttst_or_itl() {
        let record = record_with_chunks(vec![1_200]);
        let metrics = LatencyProcessor.process(&record, &FakeTokenizer);
        assert!(!metrics.iter().any(|m| m.tag == "time_to_second_token"));
        assert!(!metrics.iter().any(|m| m.tag == "inter_token_latency"));
    }

    #[test]
    fn non_streaming_record_reports_request_latency_only() {
        let record = record_with_chunks_streaming(vec![1_100, 1_250, 1_400], false);
        let metrics = LatencyProcessor.process(&record, &FakeTokenizer);

        assert!(metrics.iter().any(|m| m.tag == "request_latency"));
        assert!(!metrics.iter().any(|m| m.tag == "time_to_first_token"));
        assert!(!metrics.iter().any(|m| m.tag == "time_to_second_token"));
        assert!(!metrics.iter().any(|m| m.tag == "inter_chunk_latency"));
        assert!(!metrics.iter().any(|m| m.tag == "inter_token_latency"));
    }
}
