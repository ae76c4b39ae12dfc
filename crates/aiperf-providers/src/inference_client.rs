//! A reference `InferenceClient` over plain HTTP/HTTPS via `reqwest`,
//! streaming the response body chunk-by-chunk so the worker can hand each
//! one to a `ResponseExtractor` as it arrives.

use std::time::Duration;

use async_trait::async_trait;

use aiperf_core::error::{AIPerfError, AIPerfResult};
use aiperf_core::models::ErrorDetails;
use aiperf_core::providers::{InferenceClient, RawChunk};

pub struct HttpInferenceClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    extra_headers: Vec<(String, String)>,
}

impl HttpInferenceClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>, extra_headers: Vec<(String, String)>, request_timeout_sec: u64) -> AIPerfResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_sec))
            .build()
            .map_err(|e| AIPerfError::configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
            extra_headers,
        })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn send(&self, body: serde_json::Value, on_chunk: &mut (dyn FnMut(RawChunk) + Send)) -> AIPerfResult<()> {
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        for (name, value) in &self.extra_headers {
            request = request.header(name, value);
        }

        let mut response = request.send().await.map_err(|e| AIPerfError::comms(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(AIPerfError::Request(Box::new(ErrorDetails {
                message: format!("HTTP {status}: {body_text}"),
                code: Some(status.as_u16() as i64),
                request_type: Some("http_error".to_string()),
            })));
        }

        let mut pending: Vec<Vec<u8>> = Vec::new();
        loop {
            match response.chunk().await.map_err(|e| AIPerfError::comms(e.to_string()))? {
                Some(bytes) => pending.push(bytes.to_vec()),
                None => break,
            }
        }

        let last_index = pending.len().saturating_sub(1);
        for (index, bytes) in pending.into_iter().enumerate() {
            on_chunk(RawChunk {
                perf_ns: aiperf_core::time::perf_ns(),
                bytes,
                is_final: index == last_index,
            });
        }

        Ok(())
    }
}
