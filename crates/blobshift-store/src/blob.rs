use serde::{Deserialize, Serialize};

/// One stored object: a bucket-qualified path plus a content checksum.
///
/// The path has the form `<bucket>/<key>` and is the blob's identity for
/// migration purposes. The checksum is produced by the store that yielded the
/// blob and is only interpreted by transfer verification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Blob {
    path: String,
    checksum: String,
}

impl Blob {
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            checksum: checksum.into(),
        }
    }

    /// The full bucket-qualified path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// The bucket segment of the path (everything before the first `/`).
    pub fn bucket(&self) -> &str {
        self.path
            .split_once('/')
            .map_or(self.path.as_str(), |(bucket, _)| bucket)
    }

    /// The key within the bucket. Empty when the path has no `/`.
    pub fn key(&self) -> &str {
        self.path.split_once('/').map_or("", |(_, key)| key)
    }
}

impl std::fmt::Display for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Content digest shared by every backend: lowercase hex BLAKE3.
pub struct ContentDigest;

impl ContentDigest {
    /// Digest of the given bytes.
    pub fn of(data: &[u8]) -> String {
        blake3::hash(data).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn splits_bucket_and_key() {
        let blob = Blob::new("cc-droplets/ab/cd/droplet.tgz", "sum");
        assert_eq!(blob.bucket(), "cc-droplets");
        assert_eq!(blob.key(), "ab/cd/droplet.tgz");
        assert_eq!(blob.checksum(), "sum");
    }

    #[test]
    fn path_without_separator_is_all_bucket() {
        let blob = Blob::new("orphan", "");
        assert_eq!(blob.bucket(), "orphan");
        assert_eq!(blob.key(), "");
    }

    #[test]
    fn display_is_path() {
        let blob = Blob::new("cc-packages/pkg", "x");
        assert_eq!(blob.to_string(), "cc-packages/pkg");
    }

    #[test]
    fn serializes_both_fields() {
        let blob = Blob::new("cc-resources/r", "abc");
        let json = serde_json::to_string(&blob).unwrap();
        assert!(json.contains("\"path\":\"cc-resources/r\""));
        assert!(json.contains("\"checksum\":\"abc\""));
    }

    #[test]
    fn digest_is_blake3_hex() {
        let digest = ContentDigest::of(b"hello");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, blake3::hash(b"hello").to_hex().to_string());
        assert_ne!(digest, ContentDigest::of(b"hello!"));
    }

    proptest! {
        #[test]
        fn bucket_and_key_recombine(bucket in "[a-z-]{1,16}", key in "[a-z0-9/._-]{0,32}") {
            let blob = Blob::new(format!("{bucket}/{key}"), "");
            prop_assert_eq!(blob.bucket(), bucket.as_str());
            prop_assert_eq!(blob.key(), key.as_str());
        }
    }
}
