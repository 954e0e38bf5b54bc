use thiserror::Error;

/// Failure talking to the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// Raised by the in-memory backend, e.g. a sorted-set command against a
    /// string key.
    #[error("store command failed: {0}")]
    Backend(String),
}

/// Why a submission was not turned into a short code.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The candidate failed URL syntax or host-blacklist checks. Nothing was
    /// written.
    #[error("URL is considered invalid")]
    Validation,

    /// The atomic write batch failed as a whole.
    #[error("failed to store URL: {0}")]
    Store(#[from] StoreError),
}
