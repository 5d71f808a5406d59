use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// `(audio file, max duration seconds) -> vector[D]`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, audio_path: &std::path::Path, max_duration_secs: u32) -> Result<Vec<f32>, BackendError>;
    fn dimensions(&self) -> usize;
    fn model_version(&self) -> &str;

    /// One-time readiness check, run before the first job pickup and
    /// re-run by `/health`. Default is a no-op for back-ends with
    /// nothing to warm up; a real adapter overrides this to fail fast
    /// with `BackendError::LoadFailed` instead of on the first job.
    async fn load(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// `(audio file, model name, stem set) -> map<stem name, output path>`.
#[async_trait]
pub trait Separator: Send + Sync {
    async fn separate(
        &self,
        audio_path: &std::path::Path,
        model_name: &str,
        stems: &[String],
        out_dir: &std::path::Path,
    ) -> Result<HashMap<String, PathBuf>, BackendError>;

    async fn load(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// `(subject id) -> enrichment record`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub subject_id: String,
    pub fields: serde_json::Value,
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, subject_id: &str) -> Result<EnrichmentRecord, BackendError>;

    async fn load(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// One progress update emitted by a download in flight.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadProgress {
    pub progress: f32,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub phase: Option<String>,
}

/// One match returned by a source-catalog lookup (`Downloader::identify`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyCandidate {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_secs: Option<u32>,
}

/// `(url, format) -> file paths`, reporting progress via `on_progress`
/// and observing `cancel` cooperatively between progress lines.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        format: &str,
        out_dir: &std::path::Path,
        on_progress: &(dyn Fn(DownloadProgress) + Send + Sync),
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>, BackendError>;

    /// Resolve a free-text query against the downloader's source catalog
    /// (e.g. a search-capable extractor), without downloading anything.
    async fn identify(&self, query: &str, limit: usize) -> Result<Vec<IdentifyCandidate>, BackendError>;

    async fn load(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
