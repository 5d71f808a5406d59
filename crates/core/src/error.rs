use thiserror::Error;

/// Error kinds carried across crate boundaries and mapped to HTTP status
/// at the Job API boundary.
#[derive(Error, Debug)]
pub enum AurisError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited")]
    RateLimited,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("back-end unready: {0}")]
    BackendUnready(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(String),
}

/// Stable string tag for each error kind, used by HTTP-layer `IntoResponse`
/// impls (see `auris-server::error`) without pulling axum into this crate.
impl AurisError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not-found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate-limited",
            Self::StoreUnavailable(_) => "store-unavailable",
            Self::BackendUnready(_) => "back-end-unready",
            Self::Validation(_) => "validation",
            Self::Other(_) => "error",
        }
    }
}
