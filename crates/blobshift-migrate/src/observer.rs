//! Progress observation for migration runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use blobshift_store::Blob;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TransferError;

/// Totals for one completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Buckets walked to exhaustion (excluded buckets are not counted).
    pub buckets: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Passive sink for run lifecycle notifications.
///
/// Blob notifications (`blob_migrated`, `blob_failed`) arrive from pool
/// workers concurrently; implementations must not block for long.
pub trait MigrationObserver: Send + Sync {
    fn bucket_started(&self, _bucket: &str) {}

    /// The bucket is in the exclusion set and was not opened.
    fn bucket_skipped(&self, _bucket: &str) {}

    /// The bucket's cursor is exhausted. Transfers may still be running.
    fn bucket_completed(&self, _bucket: &str) {}

    /// The destination already holds the blob.
    fn blob_skipped(&self, _blob: &Blob) {}

    fn blob_migrated(&self, _blob: &Blob) {}

    fn blob_failed(&self, _blob: &Blob, _error: &TransferError) {}

    fn run_completed(&self, _summary: &MigrationSummary) {}
}

/// Ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl MigrationObserver for NullObserver {}

/// Emits each notification as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn bucket_started(&self, bucket: &str) {
        info!(bucket, "bucket migration started");
    }

    fn bucket_skipped(&self, bucket: &str) {
        info!(bucket, "bucket excluded");
    }

    fn bucket_completed(&self, bucket: &str) {
        info!(bucket, "bucket enumerated");
    }

    fn blob_skipped(&self, blob: &Blob) {
        debug!(path = %blob.path(), "blob already present");
    }

    fn blob_migrated(&self, blob: &Blob) {
        debug!(path = %blob.path(), "blob migrated");
    }

    fn blob_failed(&self, blob: &Blob, error: &TransferError) {
        warn!(path = %blob.path(), error = %error, "blob migration failed");
    }

    fn run_completed(&self, summary: &MigrationSummary) {
        info!(
            buckets = summary.buckets,
            migrated = summary.migrated,
            skipped = summary.skipped,
            failed = summary.failed,
            "migration complete"
        );
    }
}

/// Counts notifications and records failures.
#[derive(Debug, Default)]
pub struct CountingObserver {
    buckets: AtomicU64,
    migrated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    completed_runs: AtomicU64,
    failures: Mutex<Vec<(String, String)>>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals observed so far.
    pub fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            buckets: self.buckets.load(Ordering::Relaxed),
            migrated: self.migrated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// `(path, error message)` for every failed blob, in report order.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().expect("lock poisoned").clone()
    }

    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::Relaxed)
    }
}

impl MigrationObserver for CountingObserver {
    fn bucket_completed(&self, _bucket: &str) {
        self.buckets.fetch_add(1, Ordering::Relaxed);
    }

    fn blob_skipped(&self, _blob: &Blob) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn blob_migrated(&self, _blob: &Blob) {
        self.migrated.fetch_add(1, Ordering::Relaxed);
    }

    fn blob_failed(&self, blob: &Blob, error: &TransferError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.failures
            .lock()
            .expect("lock poisoned")
            .push((blob.path().to_string(), error.to_string()));
    }

    fn run_completed(&self, _summary: &MigrationSummary) {
        self.completed_runs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Delivers every notification to each inner observer, in order.
#[derive(Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn MigrationObserver>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    fn each(&self, f: impl Fn(&dyn MigrationObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }
}

impl std::fmt::Debug for FanoutObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl MigrationObserver for FanoutObserver {
    fn bucket_started(&self, bucket: &str) {
        self.each(|o| o.bucket_started(bucket));
    }

    fn bucket_skipped(&self, bucket: &str) {
        self.each(|o| o.bucket_skipped(bucket));
    }

    fn bucket_completed(&self, bucket: &str) {
        self.each(|o| o.bucket_completed(bucket));
    }

    fn blob_skipped(&self, blob: &Blob) {
        self.each(|o| o.blob_skipped(blob));
    }

    fn blob_migrated(&self, blob: &Blob) {
        self.each(|o| o.blob_migrated(blob));
    }

    fn blob_failed(&self, blob: &Blob, error: &TransferError) {
        self.each(|o| o.blob_failed(blob, error));
    }

    fn run_completed(&self, summary: &MigrationSummary) {
        self.each(|o| o.run_completed(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobshift_store::StoreError;

    fn failure() -> TransferError {
        TransferError::Store(StoreError::Backend("upload refused".into()))
    }

    #[test]
    fn counting_observer_tallies() {
        let observer = CountingObserver::new();
        let blob = Blob::new("cc-droplets/d", "x");
        observer.bucket_completed("cc-droplets");
        observer.blob_migrated(&blob);
        observer.blob_migrated(&blob);
        observer.blob_skipped(&blob);
        observer.blob_failed(&blob, &failure());

        assert_eq!(
            observer.summary(),
            MigrationSummary { buckets: 1, migrated: 2, skipped: 1, failed: 1 }
        );
        assert_eq!(
            observer.failures(),
            vec![("cc-droplets/d".to_string(), "upload refused".to_string())]
        );
    }

    #[test]
    fn fanout_reaches_every_observer() {
        let first = Arc::new(CountingObserver::new());
        let second = Arc::new(CountingObserver::new());
        let fanout = FanoutObserver::new()
            .with(first.clone())
            .with(Arc::new(NullObserver))
            .with(second.clone());

        fanout.blob_migrated(&Blob::new("cc-packages/p", ""));
        fanout.run_completed(&MigrationSummary::default());

        for observer in [first, second] {
            assert_eq!(observer.summary().migrated, 1);
            assert_eq!(observer.completed_runs(), 1);
        }
    }

    #[test]
    fn tracing_observer_accepts_all_events() {
        let observer = TracingObserver;
        let blob = Blob::new("cc-resources/r", "");
        observer.bucket_started("cc-resources");
        observer.bucket_skipped("cc-buildpacks");
        observer.blob_skipped(&blob);
        observer.blob_migrated(&blob);
        observer.blob_failed(&blob, &failure());
        observer.bucket_completed("cc-resources");
        observer.run_completed(&MigrationSummary::default());
    }
}
