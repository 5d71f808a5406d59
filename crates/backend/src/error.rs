use thiserror::Error;

/// Errors a compute back-end can fail a job with, one kind per modality
/// family. The worker persists `Display` of this as the job's `error`.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("load failed: {0}")]
    LoadFailed(String),

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("I/O failed: {0}")]
    IoFailed(String),

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("required tooling missing: {0}")]
    ToolingMissing(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::IoFailed(e.to_string())
    }
}

impl From<BackendError> for auris_core::AurisError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(_) => auris_core::AurisError::NotFound(e.to_string()),
            BackendError::RateLimited(_) => auris_core::AurisError::RateLimited,
            BackendError::Cancelled => auris_core::AurisError::Conflict(e.to_string()),
            _ => auris_core::AurisError::BackendUnready(e.to_string()),
        }
    }
}
