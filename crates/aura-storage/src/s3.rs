use crate::traits::{
    ListPage, ObjectEntry, ObjectVersion, PutCondition, Storage, StorageError, StorageResult,
    StoredObject,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions,
    PutPayload, UpdateVersion,
};
use std::sync::Arc;

/// S3-compatible storage implementation backed by `object_store`.
///
/// Any `ObjectStore` can be plugged in through [`S3Storage::with_store`]; the
/// in-memory store is used that way for the `memory` backend and in tests.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO, an R2 account endpoint)
    /// * `public_base_url` - Optional public base for object URLs (CDN or custom domain)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_conditional_put(S3ConditionalPut::ETagMatch);

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store: Arc::new(store),
            bucket,
            region,
            endpoint_url,
            public_base_url,
        })
    }

    /// Wrap an existing object store (no network configuration involved).
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: Option<String>,
    ) -> Self {
        S3Storage {
            store,
            bucket: bucket.into(),
            region: "auto".to_string(),
            endpoint_url: None,
            public_base_url,
        }
    }

    /// Generate public URL for an object
    ///
    /// A configured public base wins. Otherwise S3-compatible providers get the
    /// path-style `{endpoint}/{bucket}/{key}` and AWS gets the virtual-hosted style.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn put_options(content_type: &str, condition: PutCondition) -> PutOptions {
        let mode = match condition {
            PutCondition::Overwrite => PutMode::Overwrite,
            PutCondition::IfAbsent => PutMode::Create,
            PutCondition::IfMatch(version) => PutMode::Update(UpdateVersion {
                e_tag: version.e_tag,
                version: version.version,
            }),
        };
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        PutOptions {
            mode,
            attributes,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn get(&self, storage_key: &str) -> StorageResult<StoredObject> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key);

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let version = ObjectVersion {
            e_tag: result.meta.e_tag.clone(),
            version: result.meta.version.clone(),
        };
        let data = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(StoredObject { data, version })
    }

    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        condition: PutCondition,
    ) -> StorageResult<String> {
        let size = data.len();
        let location = Path::from(storage_key);
        let conditional = condition != PutCondition::Overwrite;
        let start = std::time::Instant::now();

        let result = self
            .store
            .put_opts(
                &location,
                PutPayload::from(data),
                Self::put_options(content_type, condition),
            )
            .await;

        match result {
            Ok(_) => {}
            Err(ObjectStoreError::AlreadyExists { .. })
            | Err(ObjectStoreError::Precondition { .. }) => {
                tracing::debug!(
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 conditional put lost"
                );
                return Err(StorageError::PreconditionFailed(storage_key.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            conditional,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(self.generate_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key);

        self.store.delete(&location).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage> {
        let prefix_path = Path::from(prefix.trim_end_matches('/'));
        let prefix_opt = if prefix.trim_matches('/').is_empty() {
            None
        } else {
            Some(&prefix_path)
        };

        let stream = match start_after {
            Some(offset) => {
                let offset = Path::from(offset);
                self.store.list_with_offset(prefix_opt, &offset)
            }
            None => self.store.list(prefix_opt),
        };

        let mut entries: Vec<ObjectEntry> = stream
            .map_ok(|meta| ObjectEntry {
                key: meta.location.to_string(),
                size: meta.size as u64,
            })
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        // Not every backend lists in lexical order.
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let has_more = entries.len() > limit;
        entries.truncate(limit);
        let next_cursor = if has_more {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_cursor,
        })
    }

    fn public_url(&self, storage_key: &str) -> String {
        self.generate_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_storage() -> S3Storage {
        S3Storage::with_store(
            Arc::new(InMemory::new()),
            "test-bucket",
            Some("https://media.example.test/".to_string()),
        )
    }

    #[tokio::test]
    async fn test_put_if_absent_reports_precondition() {
        let storage = memory_storage();
        let url = storage
            .put("a/b.png", Bytes::from_static(b"1"), "image/png", PutCondition::IfAbsent)
            .await
            .unwrap();
        assert_eq!(url, "https://media.example.test/a/b.png");

        let err = storage
            .put("a/b.png", Bytes::from_static(b"2"), "image/png", PutCondition::IfAbsent)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PreconditionFailed(_)));

        let stored = storage.get("a/b.png").await.unwrap();
        assert_eq!(stored.data.as_ref(), b"1");
    }

    #[tokio::test]
    async fn test_put_if_match_detects_concurrent_change() {
        let storage = memory_storage();
        storage
            .put("index.json", Bytes::from_static(b"[]"), "application/json", PutCondition::IfAbsent)
            .await
            .unwrap();
        let first = storage.get("index.json").await.unwrap();

        storage
            .put(
                "index.json",
                Bytes::from_static(b"[1]"),
                "application/json",
                PutCondition::IfMatch(first.version.clone()),
            )
            .await
            .unwrap();

        let err = storage
            .put(
                "index.json",
                Bytes::from_static(b"[2]"),
                "application/json",
                PutCondition::IfMatch(first.version),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let storage = memory_storage();
        let err = storage.get("missing.docx").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_prefix_pages() {
        let storage = memory_storage();
        for name in ["p/a", "p/b", "p/c", "q/z"] {
            storage
                .put(name, Bytes::from_static(b"x"), "text/plain", PutCondition::Overwrite)
                .await
                .unwrap();
        }

        let page = storage.list_by_prefix("p/", None, 2).await.unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["p/a", "p/b"]);
        assert_eq!(page.next_cursor.as_deref(), Some("p/b"));

        let page = storage
            .list_by_prefix("p/", page.next_cursor.as_deref(), 2)
            .await
            .unwrap();
        let keys: Vec<_> = page.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["p/c"]);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_url_styles() {
        let storage = S3Storage::with_store(Arc::new(InMemory::new()), "bucket", None);
        assert_eq!(
            storage.public_url("k.png"),
            "https://bucket.s3.auto.amazonaws.com/k.png"
        );
    }
}
