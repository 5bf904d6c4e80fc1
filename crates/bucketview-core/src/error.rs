//! Error types for the bucketview core.

/// Core error type for bucketview infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum BucketViewError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for bucketview operations.
pub type BucketViewResult<T> = Result<T, BucketViewError>;
