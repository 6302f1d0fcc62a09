//! Storage doubles wrapping the in-memory object store.

use super::{INDEX_KEY, PUBLIC_BASE_URL};
use async_trait::async_trait;
use aura_core::models::MediaAsset;
use aura_storage::{
    ListPage, PutCondition, S3Storage, Storage, StorageBackend, StorageError, StorageResult,
    StoredObject,
};
use bytes::Bytes;
use object_store::memory::InMemory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

pub fn memory_backend() -> S3Storage {
    S3Storage::with_store(
        Arc::new(InMemory::new()),
        "test-bucket",
        Some(PUBLIC_BASE_URL.to_string()),
    )
}

pub fn memory() -> Arc<dyn Storage> {
    Arc::new(memory_backend())
}

pub async fn list_keys(storage: &dyn Storage, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = storage
            .list_by_prefix(prefix, cursor.as_deref(), 100)
            .await
            .expect("list");
        keys.extend(page.entries.into_iter().map(|e| e.key));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    keys
}

pub async fn read_index(storage: &dyn Storage) -> Vec<MediaAsset> {
    match storage.get(INDEX_KEY).await {
        Ok(stored) => serde_json::from_slice(&stored.data).expect("index json"),
        Err(StorageError::NotFound(_)) => Vec::new(),
        Err(e) => panic!("index read failed: {}", e),
    }
}

pub async fn write_index(storage: &dyn Storage, entries: &[MediaAsset]) {
    let body = serde_json::to_vec(entries).expect("serialize index");
    storage
        .put(
            INDEX_KEY,
            Bytes::from(body),
            "application/json",
            PutCondition::Overwrite,
        )
        .await
        .expect("seed index");
}

/// Reports a precondition failure for the first `failures` create-only puts under
/// `prefix`; everything else goes to the in-memory store.
pub struct CollidingStorage {
    inner: S3Storage,
    prefix: String,
    failures: usize,
    attempts: AtomicUsize,
}

impl CollidingStorage {
    pub fn new(prefix: &str, failures: usize) -> Self {
        Self {
            inner: memory_backend(),
            prefix: prefix.to_string(),
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Conditional puts seen under the prefix, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
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
        if key.starts_with(&self.prefix) && condition == PutCondition::IfAbsent {
            let seen = self.attempts.fetch_add(1, Ordering::SeqCst);
            if seen < self.failures {
                return Err(StorageError::PreconditionFailed(key.to_string()));
            }
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

/// Holds the first two reads of the index until both have been issued, forcing two
/// registrations to read the same snapshot before either writes.
pub struct InterleavingIndexStorage {
    inner: S3Storage,
    barrier: Barrier,
    index_reads: AtomicUsize,
}

impl InterleavingIndexStorage {
    pub fn new() -> Self {
        Self {
            inner: memory_backend(),
            barrier: Barrier::new(2),
            index_reads: AtomicUsize::new(0),
        }
    }

    pub fn index_reads(&self) -> usize {
        self.index_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for InterleavingIndexStorage {
    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        if key == INDEX_KEY {
            let read = self.index_reads.fetch_add(1, Ordering::SeqCst);
            let result = self.inner.get(key).await;
            if read < 2 {
                self.barrier.wait().await;
            }
            return result;
        }
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        condition: PutCondition,
    ) -> StorageResult<String> {
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
