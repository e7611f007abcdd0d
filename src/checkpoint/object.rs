//! Object-store backed checkpoint storage (S3, GCS, Azure, local)

use super::store::CheckpointStore;
use crate::auth::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Checkpoint store over any `object_store` backend
#[derive(Debug, Clone)]
pub struct ObjectCheckpointStore {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix within the bucket/container
    prefix: String,
    /// URL scheme for logging
    scheme: String,
    /// Bucket, container or directory for logging
    root: String,
}

impl ObjectCheckpointStore {
    /// Wrap an existing object store
    pub fn from_store(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            scheme: "custom".to_string(),
            root: String::new(),
        }
    }

    /// S3 bucket in a region, signed with the run's credentials
    ///
    /// `endpoint` switches to path-style requests against that URL.
    pub fn s3(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        credentials: &Credentials,
    ) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(region)
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key);
        if let Some(token) = &credentials.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "s3".to_string(),
            root: bucket.to_string(),
        })
    }

    /// Parse a location URL and create the matching store
    ///
    /// Supported formats:
    /// - `s3://bucket/prefix/` - AWS S3
    /// - `gs://bucket/prefix/` - Google Cloud Storage
    /// - `az://container/prefix/` - Azure Blob Storage
    /// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;
            Ok(Self::remote(Arc::new(store), "s3", bucket, prefix))
        } else if let Some(rest) = url.strip_prefix("gs://") {
            let (bucket, prefix) = split_bucket(rest);
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self::remote(Arc::new(store), "gs", bucket, prefix))
        } else if let Some(rest) = url.strip_prefix("az://") {
            let (container, prefix) = split_bucket(rest);
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self::remote(Arc::new(store), "az", container, prefix))
        } else {
            Self::local(url.strip_prefix("file://").unwrap_or(url))
        }
    }

    /// Local directory, created if missing
    pub fn local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
            root: path.to_string(),
        })
    }

    fn remote(store: Arc<dyn ObjectStore>, scheme: &str, root: &str, prefix: String) -> Self {
        Self {
            store,
            prefix,
            scheme: scheme.to_string(),
            root: root.to_string(),
        }
    }

    /// Get the scheme (s3, gs, az, file, custom)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn object_path(&self, key: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix.trim_end_matches('/')))
        }
    }
}

#[async_trait]
impl CheckpointStore for ObjectCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.object_path(key);
        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(e) => {
                let err = Error::from(e);
                if err.is_not_found() {
                    debug!(%path, "Checkpoint object does not exist");
                    return Ok(None);
                }
                return Err(err);
            }
        };
        let data = result.bytes().await?;
        debug!(%path, bytes = data.len(), "Read checkpoint object");
        Ok(Some(data))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key);
        self.store.put(&path, data.into()).await?;
        debug!(%path, "Wrote checkpoint object");
        Ok(())
    }

    fn location(&self) -> String {
        match self.scheme.as_str() {
            "file" => self.root.clone(),
            scheme if self.prefix.is_empty() => format!("{scheme}://{}", self.root),
            scheme => format!(
                "{scheme}://{}/{}",
                self.root,
                self.prefix.trim_end_matches('/')
            ),
        }
    }
}

/// Split `bucket/some/prefix` into `("bucket", "some/prefix")`
fn split_bucket(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(idx) => (&rest[..idx], rest[idx + 1..].to_string()),
        None => (rest, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn test_split_bucket() {
        assert_eq!(split_bucket("bucket"), ("bucket", String::new()));
        assert_eq!(
            split_bucket("bucket/state/rds/"),
            ("bucket", "state/rds/".to_string())
        );
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("state");
        let store = ObjectCheckpointStore::parse(path.to_str().unwrap()).unwrap();

        assert_eq!(store.scheme(), "file");
        assert!(store.get("db_rds_log_state").await.unwrap().is_none());

        store
            .put("db_rds_log_state", Bytes::from_static(b"{\"lastReadDate\":1}"))
            .await
            .unwrap();
        let data = store.get("db_rds_log_state").await.unwrap().unwrap();
        assert_eq!(&data[..], b"{\"lastReadDate\":1}");

        assert!(path.join("db_rds_log_state").exists());
    }

    #[tokio::test]
    async fn test_prefixed_keys() {
        let inner: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let store = ObjectCheckpointStore::from_store(Arc::clone(&inner), "team/rds/");

        store.put("k", Bytes::from_static(b"v")).await.unwrap();

        let raw = inner
            .get(&ObjectPath::from("team/rds/k"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&raw[..], b"v");
        assert_eq!(&store.get("k").await.unwrap().unwrap()[..], b"v");
    }

    #[test]
    fn test_s3_location() {
        let credentials = Credentials::new("AKID", "secret").with_session_token("token");
        let store =
            ObjectCheckpointStore::s3("state-bucket", "eu-west-1", None, &credentials).unwrap();
        assert_eq!(store.scheme(), "s3");
        assert_eq!(store.location(), "s3://state-bucket");

        let local = ObjectCheckpointStore::s3(
            "state-bucket",
            "eu-west-1",
            Some("http://127.0.0.1:9000"),
            &credentials,
        )
        .unwrap();
        assert_eq!(local.location(), "s3://state-bucket");
    }

    #[test]
    fn test_file_url_prefix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", temp_dir.path().display());
        let store = ObjectCheckpointStore::parse(&url).unwrap();
        assert_eq!(store.location(), temp_dir.path().display().to_string());
    }
}
