//! A single worker: pulls credits, drives a conversation's turns end-to-end,
//! and reports both the resulting records and the credit return.
//!
//! Transliterated from `Worker._execute_single_credit_internal` in the
//! reference implementation's `workers/worker.py`: walk every turn of the
//! conversation, threading the assistant's extracted reply back in as
//! context for the next turn, publish one record per turn (success, error,
//! or cancellation - never silently dropped), and return exactly one credit
//! per conversation once every turn has been attempted.

use std::sync::Arc;
use std::time::Duration;

use aiperf_bus::LocalBus;
use aiperf_core::models::{Conversation, CreditDrop, CreditReturn, ErrorDetails, Message, MessagePayload, ParsedResponseRecord, RequestRecord, Text, Turn};
use aiperf_core::providers::{ConversationProvider, InferenceClient, RawChunk, ResponseExtractor};
use aiperf_core::{time, MessageType, ServiceId, ServiceType};
use aiperf_scheduler::{cancellation, CREDIT_QUEUE};

pub const REQUEST_RECORD_QUEUE: &str = "request_records";

const REQUEST_CANCELLATION_CODE: i64 = 499;
const REQUEST_CANCELLATION_TYPE: &str = "RequestCancellationError";

pub struct Worker {
    pub id: ServiceId,
    pub bus: LocalBus,
    pub conversations: Arc<dyn ConversationProvider>,
    pub inference_client: Arc<dyn InferenceClient>,
    pub extractor: Arc<dyn ResponseExtractor>,
    pub model: String,
    pub streaming: bool,
}

impl Worker {
    /// Runs the pull-process-report loop until the credit queue closes
    /// (every sender dropped, signalling the run is over).
    pub async fn run(&self) {
        let credits = self.bus.pull_queue(CREDIT_QUEUE).await;
        loop {
            let Ok(message) = credits.pull().await else {
                tracing::debug!(worker_id = %self.id, "credit queue closed, worker exiting");
                return;
            };
            let MessagePayload::CreditDrop(drop) = message.payload else {
                continue;
            };

            let conversation_index: usize = drop.conversation_id.parse().unwrap_or(0);
            let conversation = match self.conversations.get(conversation_index).await {
                Ok(c) => c,
                Err(err) => {
                    self.report_error(&drop, 0, None, err.to_string()).await;
                    self.report_return(drop.credit_id, drop.phase, true).await;
                    continue;
                }
            };

            let mut had_error = false;
            let mut context_turns: Vec<Turn> = Vec::new();

            for (turn_index, turn) in conversation.turns.iter().enumerate() {
                if turn_index > 0 {
                    if let Some(delay_ns) = turn.delay_ns {
                        tokio::time::sleep(Duration::from_nanos(delay_ns)).await;
                    }
                }

                if let Some(scheduled_perf_ns) = drop.scheduled_perf_ns {
                    let now = time::perf_ns();
                    if scheduled_perf_ns > now {
                        tokio::time::sleep(Duration::from_nanos(scheduled_perf_ns - now)).await;
                    }
                }

                context_turns.push(turn.clone());

                if cancellation::deadline_passed(drop.phase_deadline_perf_ns, time::perf_ns()) {
                    let record = self.phase_cancelled_record(&drop, turn_index, Some(conversation.clone()));
                    had_error = true;
                    self.publish_record(record).await;
                    break;
                }

                let record = self.run_turn(&drop, turn_index, &context_turns, Some(conversation.clone())).await;
                had_error |= record.is_error();

                let assistant_text = record.response.as_ref().and_then(|r| r.responses.iter().rev().find_map(|p| p.text.clone()));
                self.publish_record(record).await;

                if let Some(text) = assistant_text.filter(|t| !t.is_empty()) {
                    context_turns.push(Turn {
                        role: Some("assistant".to_string()),
                        texts: vec![Text { contents: vec![text] }],
                        ..Default::default()
                    });
                }
            }

            self.report_return(drop.credit_id, drop.phase, had_error).await;
        }
    }

    /// Sends one turn's request, optionally wrapped in the per-request
    /// cancellation timeout, and builds the resulting record. Always returns
    /// a record, whether the turn succeeded, errored, or was cancelled.
    async fn run_turn(&self, drop: &CreditDrop, turn_index: usize, context_turns: &[Turn], input_conversation: Option<Conversation>) -> RequestRecord {
        let request_start_ns = time::wall_ns();
        let request_start_perf_ns = time::perf_ns();
        let delayed_ns = drop.scheduled_perf_ns.map(|scheduled| request_start_perf_ns.saturating_sub(scheduled));

        let body = self.extractor.build_request(&self.model, context_turns, self.streaming);

        let chunks: std::sync::Mutex<Vec<RawChunk>> = std::sync::Mutex::new(Vec::new());
        let send_future = self.inference_client.send(body, &mut |chunk| chunks.lock().unwrap().push(chunk));

        let send_result = if drop.should_cancel {
            match tokio::time::timeout(Duration::from_nanos(drop.cancel_after_ns), send_future).await {
                Ok(result) => result,
                Err(_) => {
                    let request_end_perf_ns = time::perf_ns();
                    return RequestRecord {
                        credit_id: drop.credit_id,
                        x_request_id: uuid::Uuid::new_v4().to_string(),
                        conversation_id: drop.conversation_id.clone(),
                        turn_index,
                        phase: drop.phase,
                        credit_num: drop.credit_num,
                        model_name: self.model.clone(),
                        streaming: self.streaming,
                        request_start_ns,
                        request_start_perf_ns,
                        request_end_perf_ns,
                        delayed_ns,
                        request_headers: None,
                        input_conversation,
                        response: None,
                        error: Some(ErrorDetails {
                            message: format!("Request was cancelled after {:.3} seconds", drop.cancel_after_ns as f64 / 1_000_000_000.0),
                            code: Some(REQUEST_CANCELLATION_CODE),
                            request_type: Some(REQUEST_CANCELLATION_TYPE.to_string()),
                        }),
                        was_cancelled: true,
                        error_isl: None,
                    };
                }
            }
        } else {
            send_future.await
        };

        let request_end_perf_ns = time::perf_ns();
        let chunks = chunks.into_inner().unwrap();

        let (response, error) = match send_result {
            Ok(()) => (Some(self.extractor.extract(&chunks)), None),
            Err(err) => (None, Some(ErrorDetails::new(err.to_string()))),
        };

        RequestRecord {
            credit_id: drop.credit_id,
            x_request_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: drop.conversation_id.clone(),
            turn_index,
            phase: drop.phase,
            credit_num: drop.credit_num,
            model_name: self.model.clone(),
            streaming: self.streaming,
            request_start_ns,
            request_start_perf_ns,
            request_end_perf_ns,
            delayed_ns,
            request_headers: None,
            input_conversation,
            response,
            error,
            was_cancelled: false,
            error_isl: None,
        }
    }

    fn phase_cancelled_record(&self, drop: &CreditDrop, turn_index: usize, input_conversation: Option<Conversation>) -> RequestRecord {
        let now_perf_ns = time::perf_ns();
        RequestRecord {
            credit_id: drop.credit_id,
            x_request_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: drop.conversation_id.clone(),
            turn_index,
            phase: drop.phase,
            credit_num: drop.credit_num,
            model_name: self.model.clone(),
            streaming: self.streaming,
            request_start_ns: time::wall_ns(),
            request_start_perf_ns: now_perf_ns,
            request_end_perf_ns: now_perf_ns,
            delayed_ns: None,
            request_headers: None,
            input_conversation,
            response: None,
            error: Some(ErrorDetails {
                message: "Request was cancelled: benchmark duration and grace period elapsed".to_string(),
                code: Some(REQUEST_CANCELLATION_CODE),
                request_type: Some(REQUEST_CANCELLATION_TYPE.to_string()),
            }),
            was_cancelled: true,
            error_isl: None,
        }
    }

    async fn report_error(&self, drop: &CreditDrop, turn_index: usize, input_conversation: Option<Conversation>, message: String) {
        let now_perf_ns = time::perf_ns();
        let record = RequestRecord {
            credit_id: drop.credit_id,
            x_request_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: drop.conversation_id.clone(),
            turn_index,
            phase: drop.phase,
            credit_num: drop.credit_num,
            model_name: self.model.clone(),
            streaming: self.streaming,
            request_start_ns: time::wall_ns(),
            request_start_perf_ns: now_perf_ns,
            request_end_perf_ns: now_perf_ns,
            delayed_ns: None,
            request_headers: None,
            input_conversation,
            response: None::<ParsedResponseRecord>,
            error: Some(ErrorDetails::new(message)),
            was_cancelled: false,
            error_isl: None,
        };
        self.publish_record(record).await;
    }

    async fn publish_record(&self, record: RequestRecord) {
        if let Err(err) = self
            .bus
            .push(
                REQUEST_RECORD_QUEUE,
                Message {
                    message_type: MessageType::InferenceResults,
                    service_type: ServiceType::Worker,
                    service_id: self.id.clone(),
                    payload: MessagePayload::RequestRecord(record),
                },
            )
            .await
        {
            tracing::warn!(worker_id = %self.id, error = %err, "failed to publish request record");
        }
    }

    async fn report_return(&self, credit_id: uuid::Uuid, phase: aiperf_core::CreditPhase, had_error: bool) {
        self.bus.publish(Message {
            message_type: MessageType::CreditReturn,
            service_type: ServiceType::Worker,
            service_id: self.id.clone(),
            payload: MessagePayload::CreditReturn(CreditReturn { credit_id, phase, had_error }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_bus::Topic;
    use aiperf_core::models::{Conversation, Text, Turn};
    use aiperf_core::{AIPerfResult, CreditPhase};
    use async_trait::async_trait;

    struct OneConversation;

    #[async_trait]
    impl ConversationProvider for OneConversation {
        fn len(&self) -> usize {
            1
        }

        async fn get(&self, _index: usize) -> AIPerfResult<Conversation> {
            Ok(Conversation {
                session_id: "s1".to_string(),
                turns: vec![Turn {
                    texts: vec![Text { contents: vec!["hello".to_string()] }],
                    ..Default::default()
                }],
            })
        }
    }

    struct EchoClient;

    #[async_trait]
    impl InferenceClient for EchoClient {
        async fn send(&self, _body: serde_json::Value, on_chunk: &mut (dyn FnMut(RawChunk) + Send)) -> AIPerfResult<()> {
            on_chunk(RawChunk {
                perf_ns: time::perf_ns(),
                bytes: b"hi".to_vec(),
                is_final: true,
            });
            Ok(())
        }
    }

    struct StallingClient;

    #[async_trait]
    impl InferenceClient for StallingClient {
        async fn send(&self, _body: serde_json::Value, _on_chunk: &mut (dyn FnMut(RawChunk) + Send)) -> AIPerfResult<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct PassthroughExtractor;

    impl ResponseExtractor for PassthroughExtractor {
        fn build_request(&self, model: &str, _turns: &[Turn], _streaming: bool) -> serde_json::Value {
            serde_json::json!({ "model": model })
        }

        fn extract(&self, chunks: &[RawChunk]) -> ParsedResponseRecord {
            ParsedResponseRecord {
                responses: chunks
                    .iter()
                    .map(|c| aiperf_core::models::ParsedResponse {
                        perf_ns: c.perf_ns,
                        text: Some(String::from_utf8_lossy(&c.bytes).to_string()),
                        usage_output_tokens: None,
                        usage_input_tokens: None,
                        is_final: c.is_final,
                    })
                    .collect(),
            }
        }
    }

    fn base_drop() -> aiperf_core::models::CreditDrop {
        aiperf_core::models::CreditDrop {
            credit_id: uuid::Uuid::new_v4(),
            conversation_id: "0".to_string(),
            phase: CreditPhase::Profiling,
            credit_num: 0,
            issued_perf_ns: time::perf_ns(),
            scheduled_perf_ns: None,
            phase_deadline_perf_ns: None,
            should_cancel: false,
            cancel_after_ns: 0,
        }
    }

    #[tokio::test]
    async fn successful_request_publishes_record_and_returns_credit() {
        let bus = LocalBus::new();
        let worker = Worker {
            id: "worker_0".to_string(),
            bus: bus.clone(),
            conversations: Arc::new(OneConversation),
            inference_client: Arc::new(EchoClient),
            extractor: Arc::new(PassthroughExtractor),
            model: "test-model".to_string(),
            streaming: false,
        };

        let mut returns = bus.subscribe(Topic::Any(MessageType::CreditReturn));
        let records = bus.pull_queue(REQUEST_RECORD_QUEUE).await;

        let worker_handle = tokio::spawn(async move { worker.run().await });

        bus.push(
            CREDIT_QUEUE,
            Message {
                message_type: MessageType::CreditDrop,
                service_type: ServiceType::TimingManager,
                service_id: "tm".to_string(),
                payload: MessagePayload::CreditDrop(base_drop()),
            },
        )
        .await
        .unwrap();

        let returned = returns.recv().await.unwrap();
        assert!(matches!(returned.payload, MessagePayload::CreditReturn(ref r) if !r.had_error));

        let record_message = records.pull().await.unwrap();
        let MessagePayload::RequestRecord(record) = record_message.payload else {
            panic!("expected a request record");
        };
        assert!(!record.is_error());
        assert!(!record.x_request_id.is_empty());
        assert_eq!(record.model_name, "test-model");
        assert_eq!(record.response.unwrap().responses[0].text.as_deref(), Some("hi"));

        worker_handle.abort();
    }

    #[tokio::test]
    async fn cancelled_request_publishes_cancellation_record() {
        let bus = LocalBus::new();
        let worker = Worker {
            id: "worker_0".to_string(),
            bus: bus.clone(),
            conversations: Arc::new(OneConversation),
            inference_client: Arc::new(StallingClient),
            extractor: Arc::new(PassthroughExtractor),
            model: "test-model".to_string(),
            streaming: false,
        };

        let records = bus.pull_queue(REQUEST_RECORD_QUEUE).await;
        let worker_handle = tokio::spawn(async move { worker.run().await });

        let mut drop = base_drop();
        drop.should_cancel = true;
        drop.cancel_after_ns = 1_000_000; // 1ms

        bus.push(
            CREDIT_QUEUE,
            Message {
                message_type: MessageType::CreditDrop,
                service_type: ServiceType::TimingManager,
                service_id: "tm".to_string(),
                payload: MessagePayload::CreditDrop(drop),
            },
        )
        .await
        .unwrap();

        let record_message = records.pull().await.unwrap();
        let MessagePayload::RequestRecord(record) = record_message.payload else {
            panic!("expected a request record");
        };
        assert!(record.was_cancelled);
        assert!(record.is_error());
        assert_eq!(record.error.as_ref().unwrap().code, Some(499));
        assert_eq!(record.error.as_ref().unwrap().request_type.as_deref(), Some("RequestCancellationError"));

        worker_handle.abort();
    }
}
