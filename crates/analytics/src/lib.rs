pub mod aggregator;
pub mod batcher;
pub mod consumer;
pub mod error;
pub mod event;
pub mod realtime;

pub use aggregator::{AnalyticsAggregator, BatchIngestor};
pub use batcher::MicroBatcher;
pub use consumer::run_ingest_consumer;
pub use error::AnalyticsError;
pub use event::{AnalyticsEvent, EventType};
pub use realtime::RealtimeCounters;
