use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("store unavailable: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("unrecognized event type: {0}")]
    UnknownEventType(String),
}

impl From<AnalyticsError> for auris_core::AurisError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::Sql(_) | AnalyticsError::Redis(_) => auris_core::AurisError::StoreUnavailable(e.to_string()),
            AnalyticsError::UnknownEventType(_) => auris_core::AurisError::Validation(e.to_string()),
        }
    }
}
