//! Dispatches a job to the matching `ComputeBackend` variant and shapes
//! its result back into the job's `result` JSON field.

use std::path::{Path, PathBuf};

use auris_backend::{BackendError, ComputeBackend, DownloadProgress};
use auris_core::{Job, Modality};
use auris_store::JobStore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct ExecutionPaths {
    pub media_path: PathBuf,
    pub downloads_path: PathBuf,
}

pub async fn execute(
    backend: &ComputeBackend,
    job: &Job,
    paths: &ExecutionPaths,
    cancel: CancellationToken,
    store: &JobStore,
) -> Result<serde_json::Value, BackendError> {
    backend.load().await?;

    match job.modality {
        Modality::Embedding => execute_embedding(backend, job, &paths.media_path).await,
        Modality::StemSeparation => execute_separation(backend, job, &paths.media_path).await,
        Modality::Enrichment => execute_enrichment(backend, job).await,
        Modality::Download => execute_download(backend, job, &paths.downloads_path, cancel, store).await,
    }
}

async fn execute_embedding(backend: &ComputeBackend, job: &Job, media_path: &Path) -> Result<serde_json::Value, BackendError> {
    let embedder = backend
        .as_embedder()
        .ok_or_else(|| BackendError::LoadFailed("backend does not implement Embedder".to_string()))?;

    let relative = job.input_descriptor["path"]
        .as_str()
        .ok_or_else(|| BackendError::DecodeFailed("input_descriptor.path missing".to_string()))?;
    let max_duration = job.input_descriptor["max_duration_secs"].as_u64().unwrap_or(30) as u32;
    let full_path = media_path.join(relative);

    let vector = embedder.embed(&full_path, max_duration).await?;
    Ok(serde_json::json!({
        "vector": vector,
        "dimensions": embedder.dimensions(),
        "model_version": embedder.model_version(),
    }))
}

async fn execute_separation(backend: &ComputeBackend, job: &Job, media_path: &Path) -> Result<serde_json::Value, BackendError> {
    let separator = backend
        .as_separator()
        .ok_or_else(|| BackendError::LoadFailed("backend does not implement Separator".to_string()))?;

    let relative = job.input_descriptor["path"]
        .as_str()
        .ok_or_else(|| BackendError::DecodeFailed("input_descriptor.path missing".to_string()))?;
    let model_name = job.input_descriptor["model_name"].as_str().unwrap_or("default");
    let stems: Vec<String> = job.input_descriptor["stems"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_else(|| vec!["vocals".to_string(), "instrumental".to_string()]);

    let full_path = media_path.join(relative);
    let out_dir = media_path.join("separated").join(job.id.to_string());

    let stems_out = separator.separate(&full_path, model_name, &stems, &out_dir).await?;
    let map: serde_json::Map<String, serde_json::Value> = stems_out
        .into_iter()
        .map(|(stem, path)| (stem, serde_json::Value::String(path.to_string_lossy().to_string())))
        .collect();
    Ok(serde_json::Value::Object(map))
}

async fn execute_enrichment(backend: &ComputeBackend, job: &Job) -> Result<serde_json::Value, BackendError> {
    let enricher = backend
        .as_enricher()
        .ok_or_else(|| BackendError::LoadFailed("backend does not implement Enricher".to_string()))?;

    let record = enricher.enrich(&job.subject_id).await?;
    Ok(serde_json::json!({ "fields": record.fields }))
}

async fn execute_download(
    backend: &ComputeBackend,
    job: &Job,
    downloads_path: &Path,
    cancel: CancellationToken,
    store: &JobStore,
) -> Result<serde_json::Value, BackendError> {
    let downloader = backend
        .as_downloader()
        .ok_or_else(|| BackendError::LoadFailed("backend does not implement Downloader".to_string()))?;

    let url = job.input_descriptor["url"]
        .as_str()
        .ok_or_else(|| BackendError::DecodeFailed("input_descriptor.url missing".to_string()))?;
    let format = job.input_descriptor["format"].as_str().unwrap_or("bestaudio");
    let out_dir = downloads_path.join(job.id.to_string());

    // `on_progress` is a synchronous callback; bridge it to the async
    // store write via a channel drained by a task running alongside the
    // download instead of `.await`-ing inside the callback itself.
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<DownloadProgress>();
    let store_for_task = store.clone();
    let job_id = job.id;
    let persist_task = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            if let Err(e) = store_for_task.update_progress(job_id, update.progress).await {
                warn!(job_id = %job_id, error = %e, "failed to persist download progress");
            }
        }
    });

    let on_progress = move |p: DownloadProgress| {
        let _ = progress_tx.send(p);
    };
    let result = downloader.download(url, format, &out_dir, &on_progress, cancel).await;
    drop(on_progress);
    let _ = persist_task.await;

    let paths = result?;
    let paths_json: Vec<String> = paths.into_iter().map(|p| p.to_string_lossy().to_string()).collect();
    Ok(serde_json::json!({ "paths": paths_json }))
}
