use valist_types::Cid;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob is missing or could not be located.
    #[error("content not found: {0}")]
    NotFound(Cid),

    /// The storage network or backing directory cannot be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Blob bytes do not hash to the identifier they were stored under.
    #[error("hash mismatch for {cid}: computed {computed}")]
    HashMismatch { cid: Cid, computed: Cid },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for failures that mean the store could not be reached,
    /// as opposed to the content being absent or corrupt.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
