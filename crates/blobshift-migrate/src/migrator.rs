//! The migration orchestrator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use blobshift_store::{Blob, Store};
use tracing::{debug, info, warn};

use crate::barrier::CompletionBarrier;
use crate::error::{MigrateError, MigrateResult};
use crate::observer::{MigrationObserver, MigrationSummary};
use crate::pool::WorkPool;
use crate::transfer::BlobTransfer;

/// Per-run counters shared with in-flight transfer tasks.
#[derive(Debug, Default)]
struct RunStats {
    buckets: AtomicU64,
    migrated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl RunStats {
    fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            buckets: self.buckets.load(Ordering::Relaxed),
            migrated: self.migrated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Copies every blob of a fixed bucket list from one store to another.
///
/// Enumeration (cursor advancement, existence checks, task submission) runs
/// on the caller's task, in bucket order and cursor order. Copies run on the
/// pool. [`migrate`](Self::migrate) returns only after every copy it
/// submitted has finished.
pub struct BlobstoreMigrator {
    pool: Arc<WorkPool>,
    transfer: Arc<dyn BlobTransfer>,
    buckets: Vec<String>,
    exclusions: HashSet<String>,
    observer: Arc<dyn MigrationObserver>,
}

impl BlobstoreMigrator {
    pub fn new<I, S>(
        pool: Arc<WorkPool>,
        transfer: Arc<dyn BlobTransfer>,
        buckets: Vec<String>,
        exclusions: I,
        observer: Arc<dyn MigrationObserver>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pool,
            transfer,
            buckets,
            exclusions: exclusions.into_iter().map(Into::into).collect(),
            observer,
        }
    }

    /// The configured bucket list, in migration order.
    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    pub fn is_excluded(&self, bucket: &str) -> bool {
        self.exclusions.contains(bucket)
    }

    /// Migrate every non-excluded bucket from `src` to `dst`.
    ///
    /// Fails immediately when either store is missing (the source is checked
    /// first). A cursor that cannot be opened or advanced aborts the run with
    /// the store's error unchanged. Individual copy failures go to the
    /// observer and do not affect the result.
    pub async fn migrate(
        &self,
        dst: Option<Arc<dyn Store>>,
        src: Option<Arc<dyn Store>>,
    ) -> MigrateResult<()> {
        let src = src.ok_or(MigrateError::EmptySource)?;
        let dst = dst.ok_or(MigrateError::EmptyDestination)?;

        let run = CompletionBarrier::new();
        let stats = Arc::new(RunStats::default());
        let walked = self
            .walk_buckets(dst.as_ref(), src.as_ref(), &run, &stats)
            .await;

        // Submitted copies finish even when enumeration failed.
        run.wait().await;
        if let Err(err) = walked {
            warn!(error = %err, "migration aborted");
            return Err(err);
        }

        let summary = stats.summary();
        info!(
            src = src.name(),
            dst = dst.name(),
            migrated = summary.migrated,
            skipped = summary.skipped,
            failed = summary.failed,
            "migration finished"
        );
        self.observer.run_completed(&summary);
        Ok(())
    }

    async fn walk_buckets(
        &self,
        dst: &dyn Store,
        src: &dyn Store,
        run: &CompletionBarrier,
        stats: &Arc<RunStats>,
    ) -> MigrateResult<()> {
        for bucket in &self.buckets {
            if self.is_excluded(bucket) {
                debug!(bucket = %bucket, "skipping excluded bucket");
                self.observer.bucket_skipped(bucket);
                continue;
            }

            self.observer.bucket_started(bucket);
            let mut cursor = src.open_cursor(bucket).await?;
            let mut submitted = 0u64;
            while let Some(blob) = cursor.next().await? {
                if dst.exists(&blob).await {
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                    self.observer.blob_skipped(&blob);
                    continue;
                }
                self.submit(blob, run, stats)?;
                submitted += 1;
            }

            stats.buckets.fetch_add(1, Ordering::Relaxed);
            debug!(bucket = %bucket, submitted, "bucket enumerated");
            self.observer.bucket_completed(bucket);
        }
        Ok(())
    }

    fn submit(&self, blob: Blob, run: &CompletionBarrier, stats: &Arc<RunStats>) -> MigrateResult<()> {
        let token = run.enter();
        let transfer = Arc::clone(&self.transfer);
        let observer = Arc::clone(&self.observer);
        let stats = Arc::clone(stats);
        self.pool.submit(async move {
            let _token = token;
            match transfer.transfer(&blob).await {
                Ok(()) => {
                    stats.migrated.fetch_add(1, Ordering::Relaxed);
                    observer.blob_migrated(&blob);
                }
                Err(err) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    observer.blob_failed(&blob, &err);
                }
            }
        })
    }
}

impl std::fmt::Debug for BlobstoreMigrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobstoreMigrator")
            .field("pool", &self.pool)
            .field("buckets", &self.buckets)
            .field("exclusions", &self.exclusions)
            .finish()
    }
}
