use std::sync::Arc;

use async_trait::async_trait;
use blobshift_store::{Blob, Store};
use tracing::debug;

use crate::error::{TransferError, TransferResult};

/// Copies one blob from the source store to the destination store.
///
/// Invoked concurrently from pool workers for distinct blobs. Retry policy,
/// if any, belongs to the implementation.
#[async_trait]
pub trait BlobTransfer: Send + Sync {
    async fn transfer(&self, blob: &Blob) -> TransferResult<()>;
}

/// Download from `src`, upload to `dst`, then verify the destination
/// checksum against the one the source reported.
pub struct StoreTransfer {
    dst: Arc<dyn Store>,
    src: Arc<dyn Store>,
}

impl StoreTransfer {
    pub fn new(dst: Arc<dyn Store>, src: Arc<dyn Store>) -> Self {
        Self { dst, src }
    }
}

impl std::fmt::Debug for StoreTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTransfer")
            .field("dst", &self.dst.name())
            .field("src", &self.src.name())
            .finish()
    }
}

#[async_trait]
impl BlobTransfer for StoreTransfer {
    async fn transfer(&self, blob: &Blob) -> TransferResult<()> {
        let data = self.src.read(blob).await?;
        let size = data.len();
        self.dst.write(blob, data).await?;

        let actual = self.dst.checksum(blob).await?;
        if actual != blob.checksum() {
            return Err(TransferError::ChecksumMismatch {
                path: blob.path().to_string(),
                expected: blob.checksum().to_string(),
                actual,
            });
        }
        debug!(path = %blob.path(), size, "blob copied");
        Ok(())
    }
}
