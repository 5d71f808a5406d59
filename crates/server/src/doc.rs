//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "auris plugin API",
        version = "0.1.0",
        description = "Job queue, vector recommendations, and analytics for one auris plugin instance.",
    ),
    tags(
        (name = "Jobs", description = "Create, inspect, and cancel plugin jobs"),
        (name = "Downloads", description = "Downloader-only source-catalog lookup"),
        (name = "Recommendations", description = "Multi-modal similarity recommendations"),
        (name = "Analytics", description = "Playback event ingestion"),
        (name = "Health", description = "Readiness and capability manifest"),
    ),
    paths(
        crate::api::create_job,
        crate::api::get_job,
        crate::api::cancel_job,
        crate::api::identify,
        crate::api::list_downloads,
        crate::api::pause_download,
        crate::api::resume_download,
        crate::api::recommend,
        crate::api::ingest_events,
        crate::api::health,
        crate::api::manifest,
    ),
    components(schemas(
        crate::api::CreateJobRequest,
        crate::api::CancelResponse,
        crate::api::RecommendRequestBody,
        crate::api::IngestEventsRequest,
        crate::api::IngestEventsResponse,
        crate::api::HealthResponse,
    ))
)]
pub struct ApiDoc;
