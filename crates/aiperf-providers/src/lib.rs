//! Reference provider implementations for AIPerf
//!
//! Concrete, minimal implementations of the `aiperf-core::providers` trait
//! seams: enough to drive and test a profiling run end to end, not the full
//! dataset-composition / custom-tokenizer surface a production deployment
//! would bring its own implementations of.

pub mod conversation;
pub mod inference_client;
pub mod synthetic;
pub mod tokenizer;

pub use conversation::{SelectionMode, StaticConversationProvider};
pub use inference_client::HttpInferenceClient;
pub use synthetic::build_synthetic_conversations;
pub use tokenizer::WhitespaceTokenizer;
