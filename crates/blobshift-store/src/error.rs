/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store has no bucket with this name.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// The requested blob is not present in the store.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// A bucket name or blob path cannot be mapped onto the backend.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// I/O error from a filesystem-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by an `object_store` client.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Backend failure carried as its original message.
    #[error("{0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
