//! HTTP-backed metadata enricher.
//!
//! Calls an external generative endpoint (e.g. Ollama) with a bounded
//! timeout and a back-end-local concurrency gate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Semaphore;

use crate::error::BackendError;
use crate::traits::{Enricher, EnrichmentRecord};

pub struct LlmEnricher {
    client: reqwest::Client,
    host: String,
    model: String,
    timeout: Duration,
    gate: Arc<Semaphore>,
}

impl LlmEnricher {
    pub fn new(host: impl Into<String>, model: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into(),
            model: model.into(),
            timeout,
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(&self, subject_id: &str) -> Result<EnrichmentRecord, BackendError> {
        let _permit = self.gate.acquire().await.map_err(|e| BackendError::UpstreamError(e.to_string()))?;

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "Return a compact JSON object describing genre, mood and era for the given track id."},
                {"role": "user", "content": subject_id},
            ],
            "stream": false,
        });

        let call = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send();

        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => return Err(BackendError::UpstreamError(e.to_string())),
            Err(_) => return Err(BackendError::Timeout(self.timeout)),
        };

        if !response.status().is_success() {
            let status = response.status();
            return Err(BackendError::UpstreamError(format!("upstream returned {status}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::UpstreamError(e.to_string()))?;

        let content = parsed["message"]["content"]
            .as_str()
            .unwrap_or("{}")
            .to_string();

        let fields = serde_json::from_str(&content).unwrap_or_else(|_| json!({ "raw": content }));

        Ok(EnrichmentRecord { subject_id: subject_id.to_string(), fields })
    }

    /// Pings the Ollama host's model-list endpoint so an unreachable
    /// host fails at startup/health-check time, not the first enrich.
    async fn load(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(|e| BackendError::LoadFailed(format!("enricher host unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(BackendError::LoadFailed(format!("enricher host returned {}", response.status())));
        }
        Ok(())
    }
}
