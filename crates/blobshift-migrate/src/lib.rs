//! Bulk blob migration between two stores.
//!
//! [`BlobstoreMigrator`] walks a fixed list of buckets on a source
//! [`Store`](blobshift_store::Store), skips excluded buckets and blobs the
//! destination already holds, and fans the remaining copies out to a bounded
//! [`WorkPool`]. A failed copy is reported to the [`MigrationObserver`] and the
//! run carries on; a failed enumeration aborts the run.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blobshift_migrate::{BlobstoreMigrator, StoreTransfer, TracingObserver, WorkPool};
//! use blobshift_store::{MemoryStore, Store};
//!
//! # async fn example() -> blobshift_migrate::MigrateResult<()> {
//! let src: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let dst: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! let migrator = BlobstoreMigrator::new(
//!     Arc::new(WorkPool::new(8)?),
//!     Arc::new(StoreTransfer::new(Arc::clone(&dst), Arc::clone(&src))),
//!     vec!["cc-droplets".to_string()],
//!     Vec::<String>::new(),
//!     Arc::new(TracingObserver),
//! );
//! migrator.migrate(Some(dst), Some(src)).await?;
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod config;
pub mod error;
pub mod migrator;
pub mod observer;
pub mod pool;
pub mod transfer;

pub use barrier::{BarrierToken, CompletionBarrier};
pub use config::{MigrationConfig, StoreConfig, DEFAULT_BUCKETS, DEFAULT_CONCURRENCY};
pub use error::{MigrateError, MigrateResult, TransferError, TransferResult};
pub use migrator::BlobstoreMigrator;
pub use observer::{
    CountingObserver, FanoutObserver, MigrationObserver, MigrationSummary, NullObserver,
    TracingObserver,
};
pub use pool::WorkPool;
pub use transfer::{BlobTransfer, StoreTransfer};
