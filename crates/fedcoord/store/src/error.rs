use fedcoord_types::ContentDigest;
use thiserror::Error;

/// Result type for content-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Content-store boundary errors. `Unavailable` and `Timeout` are transient:
/// the caller may retry or route to another backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("content not found: {0}")]
    NotFound(ContentDigest),

    #[error("store call exceeded deadline after {0:?}")]
    Timeout(std::time::Duration),
}
