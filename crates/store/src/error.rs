use thiserror::Error;

/// Errors produced by [`JobStore`](crate::JobStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed job record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("job record missing required field: {0}")]
    MissingField(&'static str),
}

impl From<StoreError> for auris_core::AurisError {
    fn from(e: StoreError) -> Self {
        auris_core::AurisError::StoreUnavailable(e.to_string())
    }
}
