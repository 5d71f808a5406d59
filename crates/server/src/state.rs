//! Shared application state threaded through every handler via
//! `axum::extract::State`.
//!
//! Vector/analytics subsystems are `Option`-wrapped: a plugin that
//! never configures `POSTGRES_URL` still serves the Job API, just
//! without `/recommendations` or analytics ingestion.

use std::sync::Arc;

use auris_analytics::{AnalyticsAggregator, AnalyticsEvent, RealtimeCounters};
use auris_backend::ComputeBackend;
use auris_core::{Config, Modality};
use auris_scheduler::Scheduler;
use auris_store::JobStore;
use auris_vector::RecommendationEngine;
use auris_worker::WorkerPool;
use tokio::sync::mpsc::UnboundedSender;

pub struct AppState {
    /// The single job modality this plugin instance mints jobs for —
    /// a deployment runs one modality, never a mix (the embed-worker
    /// binary never sees `input_descriptor` shapes meant for enrichment).
    pub modality: Modality,
    pub store: JobStore,
    pub scheduler: Arc<Scheduler>,
    pub worker_pool: Arc<WorkerPool>,
    pub backend: Arc<ComputeBackend>,
    pub recommender: Option<RecommendationEngine>,
    pub analytics: Option<AnalyticsAggregator>,
    pub realtime: Option<RealtimeCounters>,
    /// Feeds the background ingestion consumer; `None` when Postgres
    /// isn't configured, so `/events` still answers but has nothing to
    /// forward events into.
    pub events_tx: Option<UnboundedSender<AnalyticsEvent>>,
    pub config: Config,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        modality: Modality,
        store: JobStore,
        scheduler: Arc<Scheduler>,
        worker_pool: Arc<WorkerPool>,
        backend: Arc<ComputeBackend>,
        recommender: Option<RecommendationEngine>,
        analytics: Option<AnalyticsAggregator>,
        realtime: Option<RealtimeCounters>,
        events_tx: Option<UnboundedSender<AnalyticsEvent>>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            modality,
            store,
            scheduler,
            worker_pool,
            backend,
            recommender,
            analytics,
            realtime,
            events_tx,
            config,
        })
    }
}
