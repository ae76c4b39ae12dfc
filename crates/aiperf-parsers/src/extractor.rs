//! Maps each [`EndpointType`] to the [`ResponseExtractor`] that knows its
//! request/response shape.

use std::sync::Arc;

use aiperf_core::enums::EndpointType;
use aiperf_core::providers::ResponseExtractor;

use crate::chat::ChatExtractor;
use crate::completions::CompletionsExtractor;
use crate::embeddings::EmbeddingsExtractor;
use crate::huggingface::HuggingfaceGenerateExtractor;
use crate::rankings::RankingsExtractor;
use crate::templated::TemplatedExtractor;

/// Builds the extractor for `endpoint_type`. `template` is only consulted
/// for [`EndpointType::Templated`] and must be present in that case.
pub fn for_endpoint(endpoint_type: EndpointType, template: Option<&str>) -> Arc<dyn ResponseExtractor> {
    match endpoint_type {
        EndpointType::Chat => Arc::new(ChatExtractor),
        EndpointType::Completions => Arc::new(CompletionsExtractor),
        EndpointType::Embeddings => Arc::new(EmbeddingsExtractor),
        EndpointType::Rankings => Arc::new(RankingsExtractor),
        EndpointType::HuggingfaceGenerate => Arc::new(HuggingfaceGenerateExtractor),
        EndpointType::Templated => Arc::new(TemplatedExtractor {
            template: template.unwrap_or_default().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_an_extractor_for_every_endpoint_type() {
        for endpoint_type in [
            EndpointType::Chat,
            EndpointType::Completions,
            EndpointType::Embeddings,
            EndpointType::Rankings,
            EndpointType::HuggingfaceGenerate,
        ] {
            let _ = for_endpoint(endpoint_type, None);
        }
        let _ = for_endpoint(EndpointType::Templated, Some(r#"{"prompt": "{{prompt}}"}"#));
    }
}
