//! Domain-focused API endpoint modules, re-exported flat for
//! `api::handler_name` import paths from `router.rs`.

mod downloads;
mod events;
mod health;
mod jobs;
mod recommendations;

pub use downloads::{
    identify, list_downloads, pause_download, resume_download, IdentifyParams, __path_identify,
    __path_list_downloads, __path_pause_download, __path_resume_download,
};
pub use events::{ingest_events, IngestEventsRequest, IngestEventsResponse, __path_ingest_events};
pub use health::{health, manifest, HealthResponse, __path_health, __path_manifest};
pub use jobs::{
    cancel_job, create_job, get_job, CancelResponse, CreateJobRequest, __path_cancel_job,
    __path_create_job, __path_get_job,
};
pub use recommendations::{recommend, RecommendRequestBody, __path_recommend};
