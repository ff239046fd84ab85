use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::{Blob, ContentDigest};
use crate::cursor::{BucketCursor, VecCursor};
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// In-memory, `BTreeMap`-based blob store.
///
/// Intended for tests and embedding. Blobs are kept in path order, so
/// enumeration is deterministic. Any bucket name can be opened; a bucket with
/// no blobs yields an exhausted cursor.
pub struct MemoryStore {
    blobs: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store content at `path` and return the blob describing it.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Bytes>) -> Blob {
        let path = path.into();
        let data = data.into();
        let blob = Blob::new(path.clone(), ContentDigest::of(&data));
        self.blobs.write().expect("lock poisoned").insert(path, data);
        blob
    }

    /// Content stored at `path`, if any.
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.blobs.read().expect("lock poisoned").get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// All stored paths in order.
    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open_cursor(&self, bucket: &str) -> StoreResult<Box<dyn BucketCursor>> {
        let prefix = format!("{bucket}/");
        let blobs = self
            .blobs
            .read()
            .expect("lock poisoned")
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, data)| Blob::new(path.clone(), ContentDigest::of(data)))
            .collect();
        Ok(Box::new(VecCursor::new(blobs)))
    }

    async fn exists(&self, blob: &Blob) -> bool {
        self.blobs
            .read()
            .expect("lock poisoned")
            .contains_key(blob.path())
    }

    async fn read(&self, blob: &Blob) -> StoreResult<Bytes> {
        self.get(blob.path())
            .ok_or_else(|| StoreError::BlobNotFound(blob.path().to_string()))
    }

    async fn write(&self, blob: &Blob, data: Bytes) -> StoreResult<()> {
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(blob.path().to_string(), data);
        Ok(())
    }
}
