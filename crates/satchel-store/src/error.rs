//! Error types for the storage layer.

/// Errors returned by a [`SessionStore`](crate::SessionStore).
///
/// The variants are the contract between stores and the session manager:
/// `NotFound` and `InvalidStoredData` are treated as "no session",
/// `Exists` is a retryable ID collision, and `InvalidData` means the
/// value can never be stored and retrying is pointless.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session is stored under the given ID (or it was evicted).
    #[error("session not found")]
    NotFound,

    /// A session is already stored under the given ID.
    #[error("session already exists")]
    Exists,

    /// The session value could not be encoded for storage.
    #[error("invalid session data: {0}")]
    InvalidData(String),

    /// A stored value could not be decoded back into a session.
    #[error("invalid stored session data: {0}")]
    InvalidStoredData(String),

    /// The backend itself failed (network, I/O, server error).
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend-specific error.
    pub fn backend(
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Backend(err.into())
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` for [`StoreError::Exists`].
    pub fn is_exists(&self) -> bool {
        matches!(self, Self::Exists)
    }
}
