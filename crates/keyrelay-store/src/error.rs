//! Store error types.

/// Errors raised by registry and client key stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing a registry file failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A registry file does not contain the expected JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Assignment was requested against an empty key pool.
    #[error("key pool is empty")]
    EmptyPool,

    /// Client key not present in the store.
    #[error("client key not found")]
    NotFound,

    /// Client key exists but has been deactivated.
    #[error("client key inactive")]
    Inactive,

    /// Client key has used up its quota.
    #[error("client key limit reached: {used}/{limit}")]
    LimitExceeded { used: u64, limit: u64 },

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}
