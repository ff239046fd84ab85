//! Directory-per-bucket blob store on a [`FileSystem`].
//!
//! Bucket `b` lives at `<root>/b`; blob `b/k` at `<root>/b/k`. A bucket with
//! no directory is treated as empty, which is what a fresh installation looks
//! like.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::blob::{Blob, ContentDigest};
use crate::cursor::{BucketCursor, VecCursor};
use crate::error::{StoreError, StoreResult};
use crate::fs::FileSystem;
use crate::traits::Store;

/// Blob store rooted at a directory of a [`FileSystem`].
pub struct LocalStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl LocalStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, blob: &Blob) -> StoreResult<PathBuf> {
        let rel = Path::new(blob.path());
        let well_formed = !blob.key().is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(StoreError::InvalidPath(blob.path().to_string()));
        }
        Ok(self.root.join(rel))
    }

    fn bucket_dir(&self, bucket: &str) -> StoreResult<PathBuf> {
        let mut components = Path::new(bucket).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(StoreError::InvalidPath(bucket.to_string())),
        }
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("root", &self.root)
            .finish()
    }
}

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(work: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
}

fn to_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks the directory listing eagerly; file contents are only read (to
/// compute checksums) as the cursor advances.
struct LocalCursor {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
    bucket: String,
    files: std::vec::IntoIter<PathBuf>,
}

#[async_trait]
impl BucketCursor for LocalCursor {
    async fn next(&mut self) -> StoreResult<Option<Blob>> {
        let Some(rel) = self.files.next() else {
            return Ok(None);
        };
        let fs = Arc::clone(&self.fs);
        let full = self.dir.join(&rel);
        let data = blocking(move || Ok(fs.read(&full)?)).await?;
        let path = format!("{}/{}", self.bucket, to_key(&rel));
        Ok(Some(Blob::new(path, ContentDigest::of(&data))))
    }
}

#[async_trait]
impl Store for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn open_cursor(&self, bucket: &str) -> StoreResult<Box<dyn BucketCursor>> {
        let dir = self.bucket_dir(bucket)?;
        if !self.fs.exists(&dir) {
            debug!(bucket, root = %self.root.display(), "bucket directory absent");
            return Ok(Box::new(VecCursor::empty()));
        }
        let fs = Arc::clone(&self.fs);
        let walk_dir = dir.clone();
        let files = blocking(move || Ok(fs.walk_files(&walk_dir)?)).await?;
        debug!(bucket, files = files.len(), "listed local bucket");
        Ok(Box::new(LocalCursor {
            fs: Arc::clone(&self.fs),
            dir,
            bucket: bucket.to_string(),
            files: files.into_iter(),
        }))
    }

    async fn exists(&self, blob: &Blob) -> bool {
        self.blob_path(blob)
            .map(|path| self.fs.exists(&path))
            .unwrap_or(false)
    }

    async fn read(&self, blob: &Blob) -> StoreResult<Bytes> {
        let path = self.blob_path(blob)?;
        let fs = Arc::clone(&self.fs);
        let missing = blob.path().to_string();
        blocking(move || match fs.read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound(missing))
            }
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn write(&self, blob: &Blob, data: Bytes) -> StoreResult<()> {
        let path = self.blob_path(blob)?;
        let fs = Arc::clone(&self.fs);
        blocking(move || Ok(fs.write(&path, &data)?)).await
    }
}

/// Builds [`LocalStore`]s for callers assembling a migration from real
/// backends.
pub struct LocalStoreFactory {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl LocalStoreFactory {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Create the store. Fails when no root directory was configured.
    pub fn new_store(&self) -> StoreResult<LocalStore> {
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath("local store root is empty".into()));
        }
        Ok(LocalStore::new(Arc::clone(&self.fs), self.root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;

    fn store_in(dir: &Path) -> LocalStore {
        LocalStoreFactory::new(Arc::new(OsFileSystem), dir)
            .new_store()
            .unwrap()
    }

    fn seed(dir: &Path, rel: &str, data: &[u8]) {
        OsFileSystem.write(&dir.join(rel), data).unwrap();
    }

    async fn drain(cursor: &mut Box<dyn BucketCursor>) -> Vec<Blob> {
        let mut out = Vec::new();
        while let Some(blob) = cursor.next().await.unwrap() {
            out.push(blob);
        }
        out
    }

    #[tokio::test]
    async fn cursor_yields_sorted_blobs_with_digests() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), "cc-droplets/cd/ef/two", b"second");
        seed(dir.path(), "cc-droplets/ab/cd/one", b"first");
        seed(dir.path(), "cc-packages/other", b"elsewhere");

        let store = store_in(dir.path());
        let mut cursor = store.open_cursor("cc-droplets").await.unwrap();
        let blobs = drain(&mut cursor).await;

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].path(), "cc-droplets/ab/cd/one");
        assert_eq!(blobs[0].checksum(), ContentDigest::of(b"first"));
        assert_eq!(blobs[1].path(), "cc-droplets/cd/ef/two");
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_bucket_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let mut cursor = store.open_cursor("cc-resources").await.unwrap();
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_traversal_bucket_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            store.open_cursor("../etc").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.open_cursor("").await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn write_then_exists_read_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let blob = Blob::new("cc-buildpacks/ab/bp.zip", ContentDigest::of(b"zip"));

        assert!(!store.exists(&blob).await);
        store.write(&blob, Bytes::from_static(b"zip")).await.unwrap();
        assert!(store.exists(&blob).await);
        assert_eq!(store.read(&blob).await.unwrap(), Bytes::from_static(b"zip"));
        assert_eq!(store.checksum(&blob).await.unwrap(), blob.checksum());
        assert!(dir.path().join("cc-buildpacks/ab/bp.zip").is_file());
    }

    #[tokio::test]
    async fn read_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let err = store.read(&Blob::new("cc-packages/none", "")).await.unwrap_err();
        assert!(matches!(err, StoreError::BlobNotFound(p) if p == "cc-packages/none"));
    }

    #[tokio::test]
    async fn malformed_blob_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        for path in ["cc-packages/../escape", "/abs/path", "nokey"] {
            let blob = Blob::new(path, "");
            assert!(!store.exists(&blob).await);
            assert!(matches!(
                store.write(&blob, Bytes::new()).await,
                Err(StoreError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn factory_rejects_empty_root() {
        let factory = LocalStoreFactory::new(Arc::new(OsFileSystem), "");
        let err = factory.new_store().unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[test]
    fn factory_builds_store_at_root() {
        let factory = LocalStoreFactory::new(Arc::new(OsFileSystem), "/var/vcap/store/shared");
        let store = factory.new_store().unwrap();
        assert_eq!(store.root(), Path::new("/var/vcap/store/shared"));
        assert_eq!(store.name(), "local");
    }
}
