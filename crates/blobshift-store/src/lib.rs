//! Blob store capability for blobshift.
//!
//! A store exposes a fixed namespace of buckets, each holding blobs that are
//! addressed by a bucket-qualified path (`<bucket>/<key>`) and carry a
//! content checksum. The migration engine only ever talks to stores through
//! the [`Store`] trait; this crate provides the trait and its backends.
//!
//! # Storage Backends
//!
//! - [`LocalStore`] -- directory-per-bucket layout on a [`FileSystem`]
//! - [`MemoryStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`ObjectStoreBlobstore`] -- one `object_store` client per bucket (S3,
//!   in-memory)
//!
//! # Design Rules
//!
//! 1. Cursor exhaustion is `Ok(None)`, never an error variant.
//! 2. Every backend reports checksums as a [`ContentDigest`] of the stored
//!    bytes, so checksums from different backends are comparable.
//! 3. `exists` never fails: a store that cannot answer reports "absent".
//! 4. Backend error messages are propagated verbatim.

pub mod blob;
pub mod cursor;
pub mod error;
pub mod fs;
pub mod local;
pub mod memory;
pub mod object;
pub mod traits;

pub use blob::{Blob, ContentDigest};
pub use cursor::{BucketCursor, VecCursor};
pub use error::{StoreError, StoreResult};
pub use fs::{FileSystem, OsFileSystem};
pub use local::{LocalStore, LocalStoreFactory};
pub use memory::MemoryStore;
pub use object::{ObjectStoreBlobstore, S3Settings};
pub use traits::Store;
