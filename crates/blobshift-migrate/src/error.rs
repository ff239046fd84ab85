use blobshift_store::StoreError;
use thiserror::Error;

/// Errors that abort a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("src is an empty store")]
    EmptySource,

    #[error("dst is an empty store")]
    EmptyDestination,

    /// Enumeration failure, propagated with its original message.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid work pool: {0}")]
    InvalidPool(String),

    #[error("work pool is shut down")]
    PoolClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type MigrateResult<T> = Result<T, MigrateError>;

/// Failure copying a single blob. Never aborts a run.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("checksum [{actual}] for [{path}] does not match expected checksum [{expected}]")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TransferResult<T> = Result<T, TransferError>;
