mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use auris_backend::{ComputeBackend, HttpEmbedder, LlmEnricher, SubprocessDownloader, SubprocessSeparator};
use auris_core::Config;
use auris_scheduler::Scheduler;
use auris_store::JobStore;
use auris_vector::{RecommendationEngine, VectorRepository};
use auris_worker::{ExecutionPaths, WorkerPool, WorkerPoolConfig};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{CliArgs, PluginModality};

#[tokio::main]
async fn main() -> Result<()> {
    auris_core::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = match &args.profile {
        Some(p) => Config::for_profile(p),
        None => Config::from_env(),
    };
    config.log_summary();

    let store = JobStore::connect(&config.redis.connection_url(), args.modality.namespace())
        .await
        .context("failed to connect job store to Redis")?;

    let scheduler = Arc::new(Scheduler::new());
    let active = store.list_active().await.context("failed to list active jobs for crash recovery")?;
    if !active.is_empty() {
        info!(count = active.len(), "recovering in-flight jobs from last shutdown");
    }
    scheduler.recover(active);

    let backend = Arc::new(build_backend(args.modality, &config));

    let pg_pool = auris_server::db::init_pg_pool(&config.postgres).await;
    let (recommender, analytics, realtime) = match &pg_pool {
        Some(pool) => {
            let recommender = RecommendationEngine::new(VectorRepository::new(pool.clone()), pool.clone());
            let analytics = auris_analytics::AnalyticsAggregator::new(pool.clone());
            let realtime = auris_analytics::RealtimeCounters::connect(&config.redis.connection_url()).await.ok();
            (Some(recommender), Some(analytics), realtime)
        }
        None => (None, None, None),
    };
    let worker_vector_repo = pg_pool.as_ref().map(|pool| VectorRepository::new(pool.clone()));

    let shutdown = CancellationToken::new();
    let worker_count = Scheduler::resolved_worker_count(config.server.max_concurrent_jobs);
    let worker_pool_config = WorkerPoolConfig {
        workers: worker_count,
        parallelism_gate: Scheduler::resolved_parallelism_gate(config.backend.max_parallel_compute, worker_count),
        paths: ExecutionPaths { media_path: config.server.media_path.clone(), downloads_path: config.server.downloads_path.clone() },
        pickup_jitter: Duration::from_millis(50),
    };
    let worker_pool = WorkerPool::new(store.clone(), scheduler.clone(), backend.clone(), worker_vector_repo, worker_pool_config, shutdown.clone());
    let worker_handles = worker_pool.spawn(worker_count);

    let (events_tx, ingest_handle) = match &analytics {
        Some(analytics) => {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let handle = tokio::spawn(auris_analytics::run_ingest_consumer(rx, analytics.clone(), realtime.clone()));
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    let host = config.server.host.clone();
    let port = config.server.port;
    let state = auris_server::AppState::new(
        args.modality.as_core(),
        store,
        scheduler,
        worker_pool,
        backend,
        recommender,
        analytics,
        realtime,
        events_tx,
        config,
    );
    let router = auris_server::build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await.with_context(|| format!("failed to bind {host}:{port}"))?;
    info!(%host, port, modality = ?args.modality, "auris plugin instance listening");

    let shutdown_signal = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            shutdown_signal.cancel();
        })
        .await
        .context("server task failed")?;

    for handle in worker_handles {
        let _ = handle.await;
    }
    if let Some(handle) = ingest_handle {
        let _ = handle.await;
    }
    Ok(())
}

fn build_backend(modality: PluginModality, config: &Config) -> ComputeBackend {
    match modality {
        PluginModality::Embedding => ComputeBackend::embedder(HttpEmbedder::new(
            config.backend.embedder_endpoint.clone(),
            config.backend.ai_model_name.clone(),
            config.backend.embedder_dimensions,
        )),
        PluginModality::StemSeparation => ComputeBackend::separator(SubprocessSeparator::new(
            config.backend.separator_binary.clone(),
            Duration::from_secs(config.backend.separator_timeout_secs),
        )),
        PluginModality::Enrichment => ComputeBackend::enricher(LlmEnricher::new(
            config.backend.ollama_host.clone(),
            config.backend.llm_model.clone(),
            Duration::from_secs(config.backend.enricher_timeout_secs),
            config.backend.enricher_max_concurrent,
        )),
        PluginModality::Download => ComputeBackend::downloader(SubprocessDownloader::new(config.backend.downloader_binary.clone())),
    }
}
