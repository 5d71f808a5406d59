//! The polymorphic compute capability a worker invokes per job modality.
//!
//! Modeled as a single enum over `async_trait` implementations: each
//! modality gets its own trait, and a plugin binary picks exactly one
//! concrete implementation at startup.

mod downloader;
mod embedder;
mod enricher;
mod error;
mod separator;
mod traits;

pub use downloader::SubprocessDownloader;
pub use embedder::HttpEmbedder;
pub use enricher::LlmEnricher;
pub use error::BackendError;
pub use separator::SubprocessSeparator;
pub use traits::{DownloadProgress, Downloader, Embedder, EnrichmentRecord, Enricher, IdentifyCandidate, Separator};

use tokio::sync::Mutex;

enum BackendKind {
    Embedder(Box<dyn Embedder>),
    Separator(Box<dyn Separator>),
    Enricher(Box<dyn Enricher>),
    Downloader(Box<dyn Downloader>),
}

/// Wraps exactly one concrete back-end and tracks whether its one-time
/// `load()` has already run, so repeated health checks or job pickups
/// don't pay initialization cost twice.
pub struct ComputeBackend {
    kind: BackendKind,
    loaded: Mutex<bool>,
}

impl ComputeBackend {
    pub fn embedder(e: impl Embedder + 'static) -> Self {
        Self { kind: BackendKind::Embedder(Box::new(e)), loaded: Mutex::new(false) }
    }

    pub fn separator(s: impl Separator + 'static) -> Self {
        Self { kind: BackendKind::Separator(Box::new(s)), loaded: Mutex::new(false) }
    }

    pub fn enricher(e: impl Enricher + 'static) -> Self {
        Self { kind: BackendKind::Enricher(Box::new(e)), loaded: Mutex::new(false) }
    }

    pub fn downloader(d: impl Downloader + 'static) -> Self {
        Self { kind: BackendKind::Downloader(Box::new(d)), loaded: Mutex::new(false) }
    }

    /// Run the one-time load step; subsequent calls are no-ops unless
    /// the previous attempt failed, in which case the next caller (a job
    /// pickup or a `/health` poll) retries it. Delegates to the concrete
    /// back-end's own `load()`, so a real initialization failure — an
    /// unreachable embedder endpoint, a missing subprocess binary —
    /// surfaces as `BackendError::LoadFailed` here instead of being
    /// swallowed by a hardcoded success.
    pub async fn load(&self) -> Result<(), BackendError> {
        let mut guard = self.loaded.lock().await;
        if *guard {
            return Ok(());
        }
        match &self.kind {
            BackendKind::Embedder(e) => e.load().await?,
            BackendKind::Separator(s) => s.load().await?,
            BackendKind::Enricher(e) => e.load().await?,
            BackendKind::Downloader(d) => d.load().await?,
        }
        *guard = true;
        Ok(())
    }

    pub async fn is_ready(&self) -> bool {
        *self.loaded.lock().await
    }

    pub fn as_embedder(&self) -> Option<&dyn Embedder> {
        match &self.kind {
            BackendKind::Embedder(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn as_separator(&self) -> Option<&dyn Separator> {
        match &self.kind {
            BackendKind::Separator(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_enricher(&self) -> Option<&dyn Enricher> {
        match &self.kind {
            BackendKind::Enricher(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn as_downloader(&self) -> Option<&dyn Downloader> {
        match &self.kind {
            BackendKind::Downloader(d) => Some(d.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _audio_path: &std::path::Path, _max_duration_secs: u32) -> Result<Vec<f32>, BackendError> {
            Ok(vec![0.0; 4])
        }
        fn dimensions(&self) -> usize { 4 }
        fn model_version(&self) -> &str { "stub-v1" }
    }

    struct UnloadableEmbedder;

    #[async_trait]
    impl Embedder for UnloadableEmbedder {
        async fn embed(&self, _audio_path: &std::path::Path, _max_duration_secs: u32) -> Result<Vec<f32>, BackendError> {
            Ok(vec![0.0; 4])
        }
        fn dimensions(&self) -> usize { 4 }
        fn model_version(&self) -> &str { "stub-v1" }
        async fn load(&self) -> Result<(), BackendError> {
            Err(BackendError::LoadFailed("upstream unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn load_is_idempotent_and_reported_by_is_ready() {
        let backend = ComputeBackend::embedder(StubEmbedder);
        assert!(!backend.is_ready().await);
        backend.load().await.unwrap();
        backend.load().await.unwrap();
        assert!(backend.is_ready().await);
    }

    #[tokio::test]
    async fn load_propagates_a_real_adapter_failure_and_stays_unready() {
        let backend = ComputeBackend::embedder(UnloadableEmbedder);
        assert!(matches!(backend.load().await, Err(BackendError::LoadFailed(_))));
        assert!(!backend.is_ready().await);
    }

    #[tokio::test]
    async fn as_embedder_only_succeeds_for_the_matching_variant() {
        let backend = ComputeBackend::embedder(StubEmbedder);
        assert!(backend.as_embedder().is_some());
        assert!(backend.as_downloader().is_none());
    }
}
