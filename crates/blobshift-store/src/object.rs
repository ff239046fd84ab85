//! Blob store over `object_store` clients, one client per bucket.
//!
//! Bucket names map onto backend buckets as `bucket_prefix + name`, which is
//! how multiple deployments share one S3 account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use tokio::sync::mpsc;
use tracing::debug;

use crate::blob::{Blob, ContentDigest};
use crate::cursor::BucketCursor;
use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// Listing results buffered ahead of the cursor.
const CURSOR_BUFFER: usize = 64;

/// Connection settings for S3-compatible backends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// Custom endpoint (MinIO, Ceph, ...). `None` uses AWS.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_prefix: String,
    pub allow_http: bool,
}

/// [`Store`] backed by one `object_store` client per bucket.
pub struct ObjectStoreBlobstore {
    name: String,
    buckets: HashMap<String, Arc<dyn ObjectStore>>,
}

impl ObjectStoreBlobstore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buckets: HashMap::new(),
        }
    }

    /// Register the client serving `bucket`.
    pub fn with_bucket(mut self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.buckets.insert(bucket.into(), store);
        self
    }

    /// In-memory clients for each bucket.
    pub fn in_memory<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        buckets.into_iter().fold(Self::new("object-memory"), |store, bucket| {
            store.with_bucket(bucket, Arc::new(InMemory::new()))
        })
    }

    /// S3 clients for each bucket.
    pub fn s3<I, S>(settings: &S3Settings, buckets: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self::new("s3");
        for bucket in buckets {
            let bucket = bucket.into();
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(format!("{}{}", settings.bucket_prefix, bucket))
                .with_region(&settings.region)
                .with_access_key_id(&settings.access_key_id)
                .with_secret_access_key(&settings.secret_access_key)
                .with_allow_http(settings.allow_http);
            if let Some(endpoint) = &settings.endpoint {
                builder = builder.with_endpoint(endpoint);
            }
            store = store.with_bucket(bucket, Arc::new(builder.build()?));
        }
        Ok(store)
    }

    /// Registered bucket names, sorted.
    pub fn bucket_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.buckets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn bucket_store(&self, bucket: &str) -> StoreResult<&Arc<dyn ObjectStore>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))
    }

    fn locate(&self, blob: &Blob) -> StoreResult<(&Arc<dyn ObjectStore>, ObjectPath)> {
        if blob.key().is_empty() {
            return Err(StoreError::InvalidPath(blob.path().to_string()));
        }
        let store = self.bucket_store(blob.bucket())?;
        Ok((store, ObjectPath::from(blob.key())))
    }
}

impl std::fmt::Debug for ObjectStoreBlobstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBlobstore")
            .field("name", &self.name)
            .field("buckets", &self.bucket_names())
            .finish()
    }
}

async fn describe(store: &Arc<dyn ObjectStore>, bucket: &str, meta: ObjectMeta) -> StoreResult<Blob> {
    let data = store.get(&meta.location).await?.bytes().await?;
    Ok(Blob::new(
        format!("{bucket}/{}", meta.location),
        ContentDigest::of(&data),
    ))
}

/// Producer side of [`ObjectCursor`]. Stops after the first error or when
/// the cursor is dropped.
async fn list_bucket(
    store: Arc<dyn ObjectStore>,
    bucket: String,
    tx: mpsc::Sender<StoreResult<Blob>>,
) {
    let mut listing = store.list(None);
    while let Some(item) = listing.next().await {
        let result = match item {
            Ok(meta) => describe(&store, &bucket, meta).await,
            Err(e) => Err(e.into()),
        };
        let failed = result.is_err();
        if tx.send(result).await.is_err() || failed {
            break;
        }
    }
    debug!(bucket = %bucket, "object listing finished");
}

/// Cursor fed by a background listing task. A closed channel is exhaustion.
struct ObjectCursor {
    rx: mpsc::Receiver<StoreResult<Blob>>,
}

#[async_trait]
impl BucketCursor for ObjectCursor {
    async fn next(&mut self) -> StoreResult<Option<Blob>> {
        self.rx.recv().await.transpose()
    }
}

#[async_trait]
impl Store for ObjectStoreBlobstore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_cursor(&self, bucket: &str) -> StoreResult<Box<dyn BucketCursor>> {
        let store = Arc::clone(self.bucket_store(bucket)?);
        let (tx, rx) = mpsc::channel(CURSOR_BUFFER);
        tokio::spawn(list_bucket(store, bucket.to_string(), tx));
        Ok(Box::new(ObjectCursor { rx }))
    }

    async fn exists(&self, blob: &Blob) -> bool {
        match self.locate(blob) {
            Ok((store, location)) => store.head(&location).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn read(&self, blob: &Blob) -> StoreResult<Bytes> {
        let (store, location) = self.locate(blob)?;
        match store.get(&location).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StoreError::BlobNotFound(blob.path().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, blob: &Blob, data: Bytes) -> StoreResult<()> {
        let (store, location) = self.locate(blob)?;
        store.put(&location, PutPayload::from(data)).await?;
        Ok(())
    }
}
