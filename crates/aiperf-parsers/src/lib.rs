//! Response extractors for AIPerf
//!
//! Each endpoint type speaks a different request/response shape over the
//! wire; the extractors here turn the raw bytes a [`aiperf_core::providers::InferenceClient`]
//! collects into a uniform [`aiperf_core::models::ParsedResponseRecord`],
//! one [`aiperf_core::providers::ResponseExtractor`] per endpoint type.

pub mod chat;
pub mod completions;
pub mod embeddings;
pub mod extractor;
pub mod huggingface;
pub mod rankings;
pub mod sse;
pub mod templated;

pub use chat::ChatExtractor;
pub use completions::CompletionsExtractor;
pub use embeddings::EmbeddingsExtractor;
pub use extractor::for_endpoint;
pub use huggingface::HuggingfaceGenerateExtractor;
pub use rankings::RankingsExtractor;
pub use templated::TemplatedExtractor;
