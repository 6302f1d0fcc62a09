//! Asset upload and reference rewriting.
//!
//! [`AssetUploader`] is the [`AssetSink`] handed to the conversion engines. Each asset
//! it receives is stored under a freshly allocated key with a create-only write, and
//! collisions are retried with the next attempt number. Uploads are strictly
//! sequential, so the asset index embedded in each key follows extraction order.

use async_trait::async_trait;
use aura_core::models::{MediaAsset, UploadedAsset};
use aura_core::AppError;
use aura_processing::{AssetSink, ExtractedAsset};
use aura_storage::{allocate_key, asset_base_name, PutCondition, Storage, StorageError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Conditional-put attempts per asset before giving up.
pub const MAX_KEY_ATTEMPTS: u32 = 5;

/// Marker tag on every index entry created from a Word document.
const WORD_IMAGE_TAG: &str = "word-image";

/// Naming inputs that stay fixed for a deployment.
#[derive(Debug, Clone)]
pub struct AssetNaming {
    /// Key namespace, e.g. `uploads/pandoc`
    pub namespace: String,
    /// First segment of every asset base name
    pub name_prefix: String,
}

/// The spellings under which a converter may reference `relative_path` in its
/// markdown. Longer spellings come first so a shorter one never rewrites part of
/// a longer match.
pub fn reference_spellings(relative_path: &str) -> Vec<String> {
    let basename = relative_path.rsplit('/').next().unwrap_or(relative_path);
    let mut spellings = vec![format!("./{}", relative_path), relative_path.to_string()];
    let media_form = format!("media/{}", basename);
    if !spellings.contains(&media_form) {
        spellings.push(media_form);
    }
    spellings
}

/// Literal (non-pattern) replacement of every spelling of `relative_path` with `url`.
pub fn rewrite_references(markdown: &str, relative_path: &str, url: &str) -> String {
    if relative_path.is_empty() {
        return markdown.to_string();
    }
    reference_spellings(relative_path)
        .iter()
        .fold(markdown.to_string(), |text, spelling| text.replace(spelling.as_str(), url))
}

/// Uploads assets for one conversion and keeps the records in upload order.
pub struct AssetUploader<'a> {
    storage: &'a dyn Storage,
    naming: &'a AssetNaming,
    doc_token: String,
    created_at: DateTime<Utc>,
    uploaded: Vec<UploadedAsset>,
    added: Vec<MediaAsset>,
}

impl<'a> AssetUploader<'a> {
    pub fn new(storage: &'a dyn Storage, naming: &'a AssetNaming, doc_token: String) -> Self {
        Self {
            storage,
            naming,
            doc_token,
            created_at: Utc::now(),
            uploaded: Vec::new(),
            added: Vec::new(),
        }
    }

    /// Upload one asset and return its public URL.
    pub async fn upload(&mut self, asset: &ExtractedAsset) -> Result<String, AppError> {
        let index = self.added.len();
        let base_name =
            asset_base_name(&self.naming.name_prefix, &self.doc_token, index, &asset.name);
        let ext = if asset.suggested_ext.is_empty() {
            "bin"
        } else {
            asset.suggested_ext.as_str()
        };

        let (key, url) = self
            .put_with_unique_key(&base_name, ext, asset.bytes.clone(), &asset.content_type)
            .await?;

        tracing::info!(
            key = %key,
            engine = %asset.origin,
            doc_token = %self.doc_token,
            index = index + 1,
            size_bytes = asset.bytes.len(),
            "Extracted asset uploaded"
        );

        self.uploaded.push(UploadedAsset {
            filename: asset.name.clone(),
            key: key.clone(),
            url: url.clone(),
        });
        self.added.push(MediaAsset {
            id: Uuid::new_v4(),
            key,
            url: url.clone(),
            filename: asset.name.clone(),
            display_name: base_name,
            content_type: asset.content_type.clone(),
            size: asset.bytes.len() as u64,
            created_at: self.created_at,
            updated_at: self.created_at,
            tags: vec![
                asset.origin.tag().to_string(),
                WORD_IMAGE_TAG.to_string(),
                format!("doc-{}", self.doc_token),
            ],
        });

        Ok(url)
    }

    /// Create-only write under a fresh key, retrying on collisions.
    async fn put_with_unique_key(
        &self,
        base_name: &str,
        ext: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(String, String), AppError> {
        for attempt in 0..MAX_KEY_ATTEMPTS {
            let key = allocate_key(&self.naming.namespace, base_name, ext, attempt);
            match self
                .storage
                .put(&key, data.clone(), content_type, PutCondition::IfAbsent)
                .await
            {
                Ok(url) => return Ok((key, url)),
                Err(StorageError::PreconditionFailed(_)) => {
                    tracing::debug!(key = %key, attempt = attempt + 1, "Asset key already taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            base_name = %base_name,
            attempts = MAX_KEY_ATTEMPTS,
            "Could not allocate a unique asset key"
        );
        Err(AppError::KeyAllocationExhausted {
            base_name: base_name.to_string(),
            attempts: MAX_KEY_ATTEMPTS,
        })
    }

    /// Records in upload order: the caller-facing list and the new index entries.
    pub fn into_records(self) -> (Vec<UploadedAsset>, Vec<MediaAsset>) {
        (self.uploaded, self.added)
    }
}

#[async_trait]
impl AssetSink for AssetUploader<'_> {
    async fn accept(&mut self, asset: ExtractedAsset) -> Result<String, AppError> {
        self.upload(&asset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_processing::EngineKind;
    use aura_storage::{ListPage, S3Storage, StorageBackend, StorageResult, StoredObject};
    use object_store::memory::InMemory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn naming() -> AssetNaming {
        AssetNaming {
            namespace: "uploads/pandoc".to_string(),
            name_prefix: "aura-pandoc-word".to_string(),
        }
    }

    fn asset(name: &str) -> ExtractedAsset {
        ExtractedAsset {
            relative_path: Some(format!("media/media/{}", name)),
            name: name.to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
            suggested_ext: "png".to_string(),
            content_type: "image/png".to_string(),
            origin: EngineKind::Pandoc,
        }
    }

    fn memory() -> S3Storage {
        S3Storage::with_store(
            Arc::new(InMemory::new()),
            "test-bucket",
            Some("https://cdn.test".to_string()),
        )
    }

    /// Rejects the first `failures` puts with a precondition failure.
    struct CollidingStorage {
        inner: S3Storage,
        failures: usize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl Storage for CollidingStorage {
        async fn get(&self, key: &str) -> StorageResult<StoredObject> {
            self.inner.get(key).await
        }

        async fn put(
            &self,
            key: &str,
            data: Bytes,
            content_type: &str,
            condition: PutCondition,
        ) -> StorageResult<String> {
            if self.puts.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StorageError::PreconditionFailed(key.to_string()));
            }
            self.inner.put(key, data, content_type, condition).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }

        async fn list_by_prefix(
            &self,
            prefix: &str,
            start_after: Option<&str>,
            limit: usize,
        ) -> StorageResult<ListPage> {
            self.inner.list_by_prefix(prefix, start_after, limit).await
        }

        fn public_url(&self, key: &str) -> String {
            self.inner.public_url(key)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    #[test]
    fn test_reference_spellings_longest_first() {
        assert_eq!(
            reference_spellings("media/media/image1.png"),
            vec![
                "./media/media/image1.png".to_string(),
                "media/media/image1.png".to_string(),
                "media/image1.png".to_string(),
            ]
        );
        assert_eq!(reference_spellings("media/image1.png").len(), 2);
    }

    #[test]
    fn test_rewrite_references_all_spellings() {
        let markdown = "![a](media/media/image1.png)\n![b](./media/media/image1.png)\n<img src=\"media/image1.png\">\nmedia/image10.png";
        let out = rewrite_references(markdown, "media/media/image1.png", "https://cdn.test/k.png");
        assert_eq!(
            out,
            "![a](https://cdn.test/k.png)\n![b](https://cdn.test/k.png)\n<img src=\"https://cdn.test/k.png\">\nmedia/image10.png"
        );
    }

    #[test]
    fn test_rewrite_references_is_literal() {
        let out = rewrite_references("a (media/x+.png) b", "media/x+.png", "U");
        assert_eq!(out, "a (U) b");
        assert_eq!(rewrite_references("keep", "", "U"), "keep");
    }

    #[tokio::test]
    async fn test_upload_records_in_order_with_distinct_keys() {
        let storage = memory();
        let naming = naming();
        let mut uploader = AssetUploader::new(&storage, &naming, "report".to_string());

        let first = uploader.upload(&asset("image1.png")).await.unwrap();
        let second = uploader.upload(&asset("image1.png")).await.unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("https://cdn.test/uploads/pandoc/"));

        let (uploaded, added) = uploader.into_records();
        assert_eq!(uploaded.len(), 2);
        assert!(uploaded[0].key.contains("aura-pandoc-word-report-img-001-image1-"));
        assert!(uploaded[1].key.contains("aura-pandoc-word-report-img-002-image1-"));
        assert_ne!(uploaded[0].key, uploaded[1].key);
        assert_eq!(added[0].display_name, "aura-pandoc-word-report-img-001-image1");
        assert_eq!(added[0].tags, vec!["pandoc", "word-image", "doc-report"]);
        assert_eq!(added[0].size, 4);

        let stored = storage.get(&uploaded[0].key).await.unwrap();
        assert_eq!(stored.data.as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_collision_retry_uses_attempt_suffix() {
        let storage = CollidingStorage {
            inner: memory(),
            failures: 2,
            puts: AtomicUsize::new(0),
        };
        let naming = naming();
        let mut uploader = AssetUploader::new(&storage, &naming, "report".to_string());

        uploader.upload(&asset("image1.png")).await.unwrap();
        let (uploaded, _) = uploader.into_records();
        assert_eq!(storage.puts.load(Ordering::SeqCst), 3);
        assert!(uploaded[0].key.contains("-img-001-image1-v3-"));
    }

    #[tokio::test]
    async fn test_collision_exhaustion_is_fatal() {
        let storage = CollidingStorage {
            inner: memory(),
            failures: usize::MAX,
            puts: AtomicUsize::new(0),
        };
        let naming = naming();
        let mut uploader = AssetUploader::new(&storage, &naming, "report".to_string());

        let err = uploader.upload(&asset("image1.png")).await.unwrap_err();
        assert!(matches!(err, AppError::KeyAllocationExhausted { attempts: 5, .. }));
        assert_eq!(storage.puts.load(Ordering::SeqCst), 5);
        let (uploaded, added) = uploader.into_records();
        assert!(uploaded.is_empty());
        assert!(added.is_empty());
    }

    #[tokio::test]
    async fn test_sink_accept_uses_asset_name_and_fallback_tag() {
        let storage = memory();
        let naming = naming();
        let mut uploader = AssetUploader::new(&storage, &naming, "notes".to_string());
        let mut fallback_asset = asset("image2.jpeg");
        fallback_asset.relative_path = None;
        fallback_asset.origin = EngineKind::DocxFallback;
        fallback_asset.suggested_ext = String::new();

        let url = uploader.accept(fallback_asset).await.unwrap();
        assert!(url.ends_with(".bin"));
        let (uploaded, added) = uploader.into_records();
        assert_eq!(uploaded[0].filename, "image2.jpeg");
        assert_eq!(added[0].tags[0], "docx-fallback");
    }
}
