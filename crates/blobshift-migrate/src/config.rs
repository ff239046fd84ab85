//! Migration configuration, loaded from TOML.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blobshift_store::{
    LocalStoreFactory, MemoryStore, ObjectStoreBlobstore, OsFileSystem, S3Settings, Store,
};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};

/// Buckets of a Cloud Controller blobstore, in migration order.
pub const DEFAULT_BUCKETS: [&str; 4] = ["cc-buildpacks", "cc-droplets", "cc-packages", "cc-resources"];

pub const DEFAULT_CONCURRENCY: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Every bucket a run walks, in order. The same list is used for every
    /// run; only `exclusions` vary.
    pub buckets: Vec<String>,
    pub exclusions: Vec<String>,
    /// Maximum concurrent blob transfers.
    pub concurrency: usize,
    pub source: StoreConfig,
    pub destination: StoreConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS.iter().map(|b| b.to_string()).collect(),
            exclusions: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            source: StoreConfig::Local {
                path: PathBuf::from("/var/vcap/store/shared"),
            },
            destination: StoreConfig::S3 {
                endpoint: None,
                region: "us-east-1".into(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
                bucket_prefix: String::new(),
                allow_http: false,
            },
        }
    }
}

impl MigrationConfig {
    pub fn from_toml_str(s: &str) -> MigrateResult<Self> {
        toml::from_str(s).map_err(|e| MigrateError::Config(e.to_string()))
    }

    /// Read and parse a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> MigrateResult<String> {
        toml::to_string_pretty(self).map_err(|e| MigrateError::Config(e.to_string()))
    }

    pub fn validate(&self) -> MigrateResult<()> {
        if self.buckets.is_empty() {
            return Err(MigrateError::Config("bucket list is empty".into()));
        }
        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            if bucket.trim().is_empty() || bucket.contains('/') {
                return Err(MigrateError::Config(format!("invalid bucket name {bucket:?}")));
            }
            if !seen.insert(bucket.as_str()) {
                return Err(MigrateError::Config(format!("duplicate bucket {bucket:?}")));
            }
        }
        if self.concurrency == 0 {
            return Err(MigrateError::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// Which backend a store is built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Directory-per-bucket layout under `path`.
    Local { path: PathBuf },
    /// S3 or an S3-compatible service; one backend bucket per blobstore bucket.
    S3 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        region: String,
        access_key_id: String,
        secret_access_key: String,
        #[serde(default)]
        bucket_prefix: String,
        #[serde(default)]
        allow_http: bool,
    },
    /// Process-local store; contents are discarded on exit.
    Memory,
}

impl StoreConfig {
    /// Assemble the store. `buckets` are the names the store must serve.
    pub fn build(&self, buckets: &[String]) -> MigrateResult<Arc<dyn Store>> {
        let store: Arc<dyn Store> = match self {
            Self::Local { path } => {
                Arc::new(LocalStoreFactory::new(Arc::new(OsFileSystem), path.clone()).new_store()?)
            }
            Self::S3 {
                endpoint,
                region,
                access_key_id,
                secret_access_key,
                bucket_prefix,
                allow_http,
            } => {
                let settings = S3Settings {
                    endpoint: endpoint.clone(),
                    region: region.clone(),
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    bucket_prefix: bucket_prefix.clone(),
                    allow_http: *allow_http,
                };
                Arc::new(ObjectStoreBlobstore::s3(&settings, buckets.iter().cloned())?)
            }
            Self::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }

    /// Human-readable description without credentials.
    pub fn describe(&self) -> String {
        match self {
            Self::Local { path } => format!("local:{}", path.display()),
            Self::S3 {
                endpoint,
                bucket_prefix,
                ..
            } => format!(
                "s3:{}{}",
                endpoint.as_deref().unwrap_or("aws"),
                if bucket_prefix.is_empty() {
                    String::new()
                } else {
                    format!(" (prefix {bucket_prefix})")
                }
            ),
            Self::Memory => "memory".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = MigrationConfig::default();
        assert_eq!(c.buckets, DEFAULT_BUCKETS);
        assert!(c.exclusions.is_empty());
        assert_eq!(c.concurrency, 20);
        assert!(matches!(c.source, StoreConfig::Local { .. }));
        assert!(matches!(c.destination, StoreConfig::S3 { .. }));
        c.validate().unwrap();
    }

    #[test]
    fn parses_partial_file_with_defaults() {
        let c = MigrationConfig::from_toml_str(
            r#"
            exclusions = ["cc-resources"]
            concurrency = 4

            [source]
            kind = "local"
            path = "/data/blobstore"

            [destination]
            kind = "s3"
            endpoint = "http://minio:9000"
            region = "eu-west-1"
            access_key_id = "key"
            secret_access_key = "secret"
            bucket_prefix = "prod-"
            allow_http = true
            "#,
        )
        .unwrap();

        assert_eq!(c.buckets.len(), 4);
        assert_eq!(c.exclusions, vec!["cc-resources"]);
        assert_eq!(c.concurrency, 4);
        assert_eq!(
            c.source,
            StoreConfig::Local {
                path: "/data/blobstore".into()
            }
        );
        match &c.destination {
            StoreConfig::S3 {
                endpoint,
                bucket_prefix,
                allow_http,
                ..
            } => {
                assert_eq!(endpoint.as_deref(), Some("http://minio:9000"));
                assert_eq!(bucket_prefix, "prod-");
                assert!(allow_http);
            }
            other => panic!("unexpected destination {other:?}"),
        }
    }

    #[test]
    fn default_survives_toml_output() {
        let c = MigrationConfig::default();
        let text = c.to_toml_string().unwrap();
        assert!(text.contains("cc-droplets"));
        assert_eq!(MigrationConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = MigrationConfig::from_toml_str("concurrency = \"many\"").unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = MigrationConfig::default();
        c.concurrency = 0;
        assert!(c.validate().is_err());

        let mut c = MigrationConfig::default();
        c.buckets.clear();
        assert!(c.validate().is_err());

        let mut c = MigrationConfig::default();
        c.buckets.push("cc-droplets".into());
        assert!(c.validate().unwrap_err().to_string().contains("duplicate"));

        let mut c = MigrationConfig::default();
        c.buckets.push("a/b".into());
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobshift.toml");
        std::fs::write(&path, "concurrency = 3\n[destination]\nkind = \"memory\"\n").unwrap();
        let c = MigrationConfig::load(&path).unwrap();
        assert_eq!(c.concurrency, 3);
        assert_eq!(c.destination, StoreConfig::Memory);

        let err = MigrationConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[tokio::test]
    async fn builds_each_backend() {
        let buckets: Vec<String> = DEFAULT_BUCKETS.iter().map(|b| b.to_string()).collect();
        let dir = tempfile::tempdir().unwrap();

        let local = StoreConfig::Local {
            path: dir.path().to_path_buf(),
        };
        assert_eq!(local.build(&buckets).unwrap().name(), "local");
        assert_eq!(StoreConfig::Memory.build(&buckets).unwrap().name(), "memory");
        assert_eq!(
            MigrationConfig::default().destination.build(&buckets).unwrap().name(),
            "s3"
        );

        let empty = StoreConfig::Local { path: PathBuf::new() };
        assert!(matches!(empty.build(&buckets), Err(MigrateError::Store(_))));
    }

    #[test]
    fn describe_hides_credentials() {
        let s3 = StoreConfig::S3 {
            endpoint: Some("http://minio:9000".into()),
            region: "us-east-1".into(),
            access_key_id: "AKIA".into(),
            secret_access_key: "topsecret".into(),
            bucket_prefix: "prod-".into(),
            allow_http: true,
        };
        let text = s3.describe();
        assert!(text.contains("minio"));
        assert!(!text.contains("topsecret"));
        assert_eq!(StoreConfig::Memory.describe(), "memory");
    }
}
