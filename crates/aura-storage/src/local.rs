use crate::traits::{
    ListPage, ObjectEntry, ObjectVersion, PutCondition, Storage, StorageError, StorageResult,
    StoredObject,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::io::Write;
use tokio::fs;
use tokio::sync::Mutex;

/// Staging files live beside their target and are hidden from listings.
const TEMP_FILE_PREFIX: &str = ".aura-staging-";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    // Serializes conditional writes so check-then-write is atomic within the process.
    write_lock: Arc<Mutex<()>>,
}

fn content_version(data: &[u8]) -> ObjectVersion {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    ObjectVersion {
        e_tag: Some(format!("{:016x}-{:x}", hasher.finish(), data.len())),
        version: None,
    }
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/aura/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        crate::keys::validate_storage_key(storage_key).map_err(StorageError::InvalidKey)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write `data` to a temp file beside `path`, then rename it into place so readers
    /// see either the old object or the new one, never a partial write. Create-only
    /// writes rename with no-clobber.
    async fn write_file(path: &Path, data: Bytes, create_new: bool) -> StorageResult<()> {
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::write_atomically(&target, &data, create_new))
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Write task failed: {}", e)))?
    }

    fn write_atomically(path: &Path, data: &[u8], create_new: bool) -> StorageResult<()> {
        let dir = path.parent().ok_or_else(|| {
            StorageError::InvalidKey(format!("{} has no parent directory", path.display()))
        })?;
        let upload_failed = |action: &str, e: std::io::Error| {
            StorageError::UploadFailed(format!("Failed to {} {}: {}", action, path.display(), e))
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| upload_failed("stage", e))?;
        temp.write_all(data).map_err(|e| upload_failed("write", e))?;
        temp.as_file().sync_all().map_err(|e| upload_failed("sync", e))?;

        let persisted = if create_new {
            temp.persist_noclobber(path)
        } else {
            temp.persist(path)
        };
        persisted.map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                StorageError::PreconditionFailed(path.display().to_string())
            } else {
                upload_failed("persist", e.error)
            }
        })?;
        Ok(())
    }

    /// Recursively collect every file key below `dir`.
    async fn collect_keys(&self, dir: PathBuf) -> StorageResult<Vec<ObjectEntry>> {
        let mut entries = Vec::new();
        let mut pending = vec![dir];

        while let Some(current) = pending.pop() {
            let mut read_dir = match fs::read_dir(&current).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = read_dir.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                if metadata.is_dir() {
                    pending.push(path);
                } else if entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(TEMP_FILE_PREFIX)
                {
                    continue;
                } else if let Ok(relative) = path.strip_prefix(&self.base_path) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    entries.push(ObjectEntry {
                        key,
                        size: metadata.len(),
                    });
                }
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn get(&self, storage_key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage get successful"
        );

        let version = content_version(&data);
        Ok(StoredObject {
            data: Bytes::from(data),
            version,
        })
    }

    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
        condition: PutCondition,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();
        self.ensure_parent_dir(&path).await?;
        let start = std::time::Instant::now();

        let _guard = self.write_lock.lock().await;
        match condition {
            PutCondition::Overwrite => Self::write_file(&path, data, false).await?,
            PutCondition::IfAbsent => Self::write_file(&path, data, true)
                .await
                .map_err(|e| match e {
                    StorageError::PreconditionFailed(_) => {
                        StorageError::PreconditionFailed(storage_key.to_string())
                    }
                    other => other,
                })?,
            PutCondition::IfMatch(expected) => {
                let current = match fs::read(&path).await {
                    Ok(existing) => Some(content_version(&existing)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                };
                if current.as_ref() != Some(&expected) {
                    return Err(StorageError::PreconditionFailed(storage_key.to_string()));
                }
                Self::write_file(&path, data, false).await?;
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(self.generate_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage> {
        let mut entries: Vec<ObjectEntry> = self
            .collect_keys(self.base_path.clone())
            .await?
            .into_iter()
            .filter(|e| e.key.starts_with(prefix))
            .filter(|e| start_after.map_or(true, |after| e.key.as_str() > after))
            .collect();

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
        StorageBackend::Local
    }
}
