use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("store unavailable: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("unknown modality tag: {0}")]
    UnknownModality(String),
}

impl From<VectorError> for auris_core::AurisError {
    fn from(e: VectorError) -> Self {
        match e {
            VectorError::Sql(_) => auris_core::AurisError::StoreUnavailable(e.to_string()),
            VectorError::UnknownModality(_) => auris_core::AurisError::Validation(e.to_string()),
        }
    }
}
