use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::{Blob, ContentDigest};
use crate::cursor::BucketCursor;
use crate::error::StoreResult;

/// A blob store: a fixed set of buckets holding content-checksummed blobs.
///
/// All implementations must satisfy these invariants:
/// - `open_cursor` enumerates each blob of the bucket exactly once.
/// - `checksum` is the [`ContentDigest`] of the stored bytes, so values are
///   comparable across backends.
/// - `write` overwrites any previous content at the same path.
/// - Concurrent `read`/`write` calls for distinct blobs are safe.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name used in log output.
    fn name(&self) -> &str;

    /// Open a cursor over every blob in `bucket`.
    async fn open_cursor(&self, bucket: &str) -> StoreResult<Box<dyn BucketCursor>>;

    /// Whether a blob with this path is already present.
    ///
    /// A store that cannot answer (unreachable backend, malformed path)
    /// reports `false`; the subsequent write surfaces the real failure.
    async fn exists(&self, blob: &Blob) -> bool;

    /// Download the blob's content.
    async fn read(&self, blob: &Blob) -> StoreResult<Bytes>;

    /// Upload content for the blob's path.
    async fn write(&self, blob: &Blob, data: Bytes) -> StoreResult<()>;

    /// Digest of the content currently stored for the blob's path.
    async fn checksum(&self, blob: &Blob) -> StoreResult<String> {
        let data = self.read(blob).await?;
        Ok(ContentDigest::of(&data))
    }
}
