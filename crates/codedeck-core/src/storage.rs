//! Object storage seam.
//!
//! `ObjectStore` is the engine's only view of durable storage. The
//! production implementation is [`S3Store`] (any S3-compatible endpoint);
//! [`MemoryStore`] backs tests and local development without credentials.
//! The store is constructed once at startup and handed to the components
//! that need it; there is no process-wide global client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Object keys in this page.
    pub keys: Vec<String>,
    /// Continuation token for the next page, if more objects remain.
    pub next: Option<String>,
}

/// Storage operations the engine needs: paged listing, whole-object get/put,
/// and storage-side copy (no object bytes transit this process).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`, starting after `continuation` when given.
    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage>;

    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Write an object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Copy an object to a new key without downloading it.
    async fn copy(&self, source_key: &str, dest_key: &str) -> Result<()>;
}

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Bucket holding workspace and template prefixes.
    pub bucket: String,
    /// AWS region name.
    pub region: String,
    /// Custom endpoint URL (MinIO and friends); default AWS when unset.
    pub endpoint: Option<String>,
    /// Static access key; falls back to the default credential chain when unset.
    pub access_key_id: Option<String>,
    /// Static secret key.
    pub secret_access_key: Option<String>,
}

/// S3-backed object store.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Wrap an existing SDK client.
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from settings. Static credentials override the default
    /// provider chain only when both halves are present.
    pub async fn connect(settings: S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region));
        if let Some(endpoint) = settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key), Some(secret)) = (settings.access_key_id, settings.secret_access_key) {
            loader =
                loader.credentials_provider(Credentials::new(key, secret, None, None, "codedeck"));
        }
        let sdk_config = loader.load().await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), settings.bucket)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("list {}: {}", prefix, e)))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ObjectPage { keys, next })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("get {}: {}", key, e)))?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("read body of {}: {}", key, e)))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("put {}: {}", key, e)))?;
        Ok(())
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("copy {} -> {}: {}", source_key, dest_key, e)))?;
        debug!(source = %source_key, dest = %dest_key, "copied object");
        Ok(())
    }
}

/// In-process object store for tests and credential-free local runs.
///
/// Listing is paginated with a configurable page size so pagination paths
/// get exercised the same way they do against S3.
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
}

impl MemoryStore {
    /// Store with the default page size (1000, matching S3's listing default).
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// Store returning at most `page_size` keys per listing page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage> {
        let objects = self.objects.read().await;
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        if let Some(token) = continuation {
            keys.retain(|key| key.as_str() > token.as_str());
        }
        let has_more = keys.len() > self.page_size;
        keys.truncate(self.page_size);
        let next = if has_more { keys.last().cloned() } else { None };
        Ok(ObjectPage { keys, next })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no such key: {}", key)))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        let bytes = objects
            .get(source_key)
            .cloned()
            .ok_or_else(|| Error::Storage(format!("no such key: {}", source_key)))?;
        objects.insert(dest_key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put("code/ws/index.js", b"hi".to_vec()).await.unwrap();
        assert_eq!(store.get("code/ws/index.js").await.unwrap(), b"hi");
        assert!(store.get("code/ws/missing").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_list_filters_by_prefix() {
        let store = MemoryStore::new();
        store.put("code/a/one", vec![]).await.unwrap();
        store.put("code/b/two", vec![]).await.unwrap();

        let page = store.list("code/a/", None).await.unwrap();
        assert_eq!(page.keys, vec!["code/a/one"]);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_paginates() {
        let store = MemoryStore::with_page_size(2);
        for i in 0..5 {
            store.put(&format!("base/node/f{}", i), vec![i]).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut token = None;
        let mut pages = 0;
        loop {
            let page = store.list("base/node/", token).await.unwrap();
            assert!(page.keys.len() <= 2);
            seen.extend(page.keys);
            pages += 1;
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_memory_store_copy() {
        let store = MemoryStore::new();
        store.put("base/node/index.js", b"x".to_vec()).await.unwrap();
        store.copy("base/node/index.js", "code/abc/index.js").await.unwrap();
        assert_eq!(store.get("code/abc/index.js").await.unwrap(), b"x");

        assert!(store.copy("base/node/missing", "code/abc/missing").await.is_err());
    }
}
