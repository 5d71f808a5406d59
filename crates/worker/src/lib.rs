//! The worker pool: `N` tasks draining the scheduler, each re-checking
//! dedup state, persisting the `processing` transition, invoking the
//! compute back-end behind a parallelism gate, and persisting the
//! terminal result.

mod execute;
mod registry;

pub use execute::ExecutionPaths;
pub use registry::CancellationRegistry;

use std::sync::Arc;
use std::time::Duration;

use auris_backend::{BackendError, ComputeBackend};
use auris_core::{JobStatus, Modality};
use auris_scheduler::Scheduler;
use auris_store::JobStore;
use auris_vector::{VectorModality, VectorRepository};
use chrono::Utc;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct WorkerPoolConfig {
    pub workers: usize,
    pub parallelism_gate: usize,
    pub paths: ExecutionPaths,
    pub pickup_jitter: Duration,
}

pub struct WorkerPool {
    store: JobStore,
    scheduler: Arc<Scheduler>,
    backend: Arc<ComputeBackend>,
    vector_repo: Option<VectorRepository>,
    gate: Arc<Semaphore>,
    paths: Arc<ExecutionPaths>,
    cancellations: Arc<CancellationRegistry>,
    shutdown: CancellationToken,
    pickup_jitter: Duration,
}

impl WorkerPool {
    pub fn new(
        store: JobStore,
        scheduler: Arc<Scheduler>,
        backend: Arc<ComputeBackend>,
        vector_repo: Option<VectorRepository>,
        config: WorkerPoolConfig,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            scheduler,
            backend,
            vector_repo,
            gate: Arc::new(Semaphore::new(config.parallelism_gate.max(1))),
            paths: Arc::new(config.paths),
            cancellations: Arc::new(CancellationRegistry::new()),
            shutdown,
            pickup_jitter: config.pickup_jitter,
        })
    }

    pub fn cancellations(&self) -> Arc<CancellationRegistry> {
        self.cancellations.clone()
    }

    /// Spawn `n` worker tasks; returns their join handles for the
    /// caller to await at shutdown.
    pub fn spawn(self: &Arc<Self>, n: usize) -> Vec<JoinHandle<()>> {
        (0..n)
            .map(|idx| {
                let pool = self.clone();
                tokio::spawn(async move { pool.run_loop(idx).await })
            })
            .collect()
    }

    async fn run_loop(self: Arc<Self>, worker_idx: usize) {
        info!(worker = worker_idx, "worker started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                id = self.scheduler.dequeue() => {
                    self.process(id).await;
                }
            }
        }
        info!(worker = worker_idx, "worker shut down");
    }

    async fn process(&self, id: auris_core::JobId) {
        if !self.pickup_jitter.is_zero() {
            let jitter_ms = rand::thread_rng().gen_range(0..=self.pickup_jitter.as_millis() as u64);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }

        let mut job = match self.store.get(id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %id, "dequeued id has no job record, dropping");
                return;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "failed to load job, dropping");
                return;
            }
        };

        if job.status != JobStatus::Pending {
            return;
        }
        if !job.transition(JobStatus::Processing, Utc::now()) {
            return;
        }
        if let Err(e) = self.store.save(&job).await {
            error!(job_id = %id, error = %e, "failed to persist processing transition, dropping");
            return;
        }

        let job_token = self.shutdown.child_token();
        self.cancellations.register(job.id, job_token.clone());

        let result = {
            let _permit = self.gate.acquire().await;
            execute::execute(&self.backend, &job, &self.paths, job_token, &self.store).await
        };

        self.cancellations.unregister(job.id);

        let now = Utc::now();
        match result {
            Ok(value) => {
                if job.modality == Modality::Embedding {
                    self.persist_vector(&job.subject_id, &value).await;
                }
                job.mark_completed(value, now);
            }
            Err(BackendError::Cancelled) => {
                job.transition(JobStatus::Cancelled, now);
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "job failed");
                job.mark_failed(e.to_string(), now);
            }
        }

        if let Err(e) = self.store.save(&job).await {
            error!(job_id = %id, error = %e, "failed to persist terminal state");
        }
    }

    /// Writes the embedder's output vector into the audio-spectral
    /// table so the recommendation engine can see it. A missing
    /// `VectorRepository` (Postgres unconfigured) or a malformed result
    /// is logged and otherwise non-fatal — the job already completed.
    async fn persist_vector(&self, subject_id: &str, result: &serde_json::Value) {
        let Some(repo) = &self.vector_repo else { return };
        let Some(vector) = result.get("vector").and_then(|v| v.as_array()) else {
            warn!(subject_id, "embedding result had no vector field, skipping vector store write");
            return;
        };
        let vector: Vec<f32> = vector.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
        let model_version = result.get("model_version").and_then(|v| v.as_str()).unwrap_or("unknown");

        if let Err(e) = repo.upsert(&VectorModality::AudioSpectral, subject_id, vector, model_version).await {
            error!(subject_id, error = %e, "failed to persist embedding vector");
        }
    }
}
