//! The `good_request_count` metric: 1 for a clean record, 0 for an errored
//! or cancelled one. Summed across a run this must equal `total_requests_sent
//! - sum(error_summary counts)`.

use aiperf_core::models::{MetricRecord, RequestRecord};
use aiperf_core::providers::Tokenizer;

use crate::dict;
use crate::processor::RecordProcessor;

pub struct GoodRequestCountProcessor;

impl RecordProcessor for GoodRequestCountProcessor {
    fn name(&self) -> &'static str {
        "good_request_count"
    }

    fn process(&self, record: &RequestRecord, _tokenizer: &dyn Tokenizer) -> Vec<MetricRecord> {
        vec![MetricRecord {
            tag: dict::GOOD_REQUEST_COUNT.tag.to_string(),
            value: if record.is_error() { 0.0 } else { 1.0 },
            unit: dict::GOOD_REQUEST_COUNT.unit,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::enums::CreditPhase;
    use aiperf_core::models::ErrorDetails;
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

    fn record(error: Option<ErrorDetails>) -> RequestRecord {
        RequestRecord {
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
            response: None,
            error,
            was_cancelled: false,
            error_isl: None,
        }
    }

    #[test]
    fn good_record_counts_one() {
        let metrics = GoodRequestCountProcessor.process(&record(None), &NullTokenizer);
        assert_eq!(metrics[0].value, 1.0);
    }

    #[test]
    fn errored_record_counts_zero() {
        let metrics = GoodRequestCountProcessor.process(&record(Some(ErrorDetails::new("boom"))), &NullTokenizer);
        assert_eq!(metrics[0].value, 0.0);
    }
}
