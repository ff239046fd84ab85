use async_trait::async_trait;

use crate::blob::Blob;
use crate::error::StoreResult;

/// Forward-only, non-restartable sequence of blobs from one bucket.
///
/// Advancing yields one of three outcomes:
/// - `Ok(Some(blob))` -- the next blob;
/// - `Ok(None)` -- the bucket is exhausted. This is normal termination, and
///   every further call keeps returning `Ok(None)`;
/// - `Err(_)` -- enumeration failed.
#[async_trait]
pub trait BucketCursor: Send {
    async fn next(&mut self) -> StoreResult<Option<Blob>>;
}

/// Cursor over blobs that were already collected.
#[derive(Debug)]
pub struct VecCursor {
    blobs: std::vec::IntoIter<Blob>,
}

impl VecCursor {
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self {
            blobs: blobs.into_iter(),
        }
    }

    /// A cursor that is exhausted from the start.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl BucketCursor for VecCursor {
    async fn next(&mut self) -> StoreResult<Option<Blob>> {
        Ok(self.blobs.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_in_order_then_stays_exhausted() {
        let mut cursor = VecCursor::new(vec![Blob::new("b/1", "a"), Blob::new("b/2", "b")]);
        assert_eq!(cursor.next().await.unwrap().unwrap().path(), "b/1");
        assert_eq!(cursor.next().await.unwrap().unwrap().path(), "b/2");
        assert!(cursor.next().await.unwrap().is_none());
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_cursor_is_exhausted() {
        let mut cursor = VecCursor::empty();
        assert!(cursor.next().await.unwrap().is_none());
    }
}
