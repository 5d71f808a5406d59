//! Background ingestion consumer: drains an in-process channel of
//! [`AnalyticsEvent`]s fed by the HTTP ingestion route, recording each
//! one against the real-time counters immediately and accumulating it
//! into a [`BatchIngestor`] for batched durable upserts.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::aggregator::{AnalyticsAggregator, BatchIngestor};
use crate::event::AnalyticsEvent;
use crate::realtime::RealtimeCounters;

const MAX_BATCH_SIZE: usize = 200;
const MAX_BATCH_WAIT: Duration = Duration::from_secs(5);
const FLUSH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Runs until `events` is closed (i.e. the sending `AppState` — and the
/// server — is gone), then force-flushes any partial batch before
/// returning.
pub async fn run_ingest_consumer(
    mut events: UnboundedReceiver<AnalyticsEvent>,
    aggregator: AnalyticsAggregator,
    realtime: Option<RealtimeCounters>,
) {
    let mut ingestor = BatchIngestor::new(aggregator, MAX_BATCH_SIZE, MAX_BATCH_WAIT);
    info!(max_batch_size = MAX_BATCH_SIZE, "analytics ingestion consumer started");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Some(realtime) = &realtime {
                    if let Err(e) = realtime.record(&event).await {
                        warn!(subject_id = %event.subject_id, error = %e, "failed to record real-time counters");
                    }
                }
                ingestor.push(vec![event]);
                if ingestor.should_flush() {
                    ingestor.flush().await;
                }
            }
            _ = tokio::time::sleep(FLUSH_CHECK_INTERVAL) => {
                if ingestor.should_flush() {
                    ingestor.flush().await;
                }
            }
        }
    }

    info!("analytics ingestion channel closed, draining final batch");
    ingestor.force_flush().await;
}
