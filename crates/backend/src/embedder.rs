//! HTTP-backed audio embedder.
//!
//! Talks to a local inference server (e.g. an ONNX or CLAP model served
//! over HTTP): one POST, JSON in, JSON out.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::BackendError;
use crate::traits::Embedder;

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model_version: String,
    dimensions: usize,
}

impl HttpEmbedder {
    pub fn new(endpoint: impl Into<String>, model_version: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model_version: model_version.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, audio_path: &std::path::Path, max_duration_secs: u32) -> Result<Vec<f32>, BackendError> {
        if !audio_path.exists() {
            return Err(BackendError::DecodeFailed(format!("no such file: {}", audio_path.display())));
        }

        debug!(path = %audio_path.display(), max_duration_secs, "embedding request");

        let body = json!({
            "path": audio_path.to_string_lossy(),
            "max_duration_secs": max_duration_secs,
        });

        let response = self
            .client
            .post(format!("{}/embed", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::InferenceFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::InferenceFailed(format!("{status}: {text}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::InferenceFailed(e.to_string()))?;

        let vector: Vec<f32> = parsed["vector"]
            .as_array()
            .ok_or_else(|| BackendError::InferenceFailed("missing 'vector' field".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.len() != self.dimensions {
            return Err(BackendError::InferenceFailed(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                vector.len()
            )));
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Pings the inference server so an unreachable endpoint fails at
    /// startup/health-check time rather than on the first embed request.
    async fn load(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
            .map_err(|e| BackendError::LoadFailed(format!("embedder endpoint unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(BackendError::LoadFailed(format!("embedder health check returned {}", response.status())));
        }
        Ok(())
    }
}
