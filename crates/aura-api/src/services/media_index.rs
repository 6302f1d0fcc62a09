//! Media index registration.
//!
//! The index is one JSON document (an array of [`MediaAsset`], newest first) shared by
//! every conversion. [`MediaIndexHandle`] owns the location of that document and
//! [`IndexRegistrar`] merges new entries into it with the configured write strategy.

use aura_core::models::MediaAsset;
use aura_core::{AppError, IndexWriteStrategy};
use aura_storage::{ObjectVersion, PutCondition, Storage, StorageError};
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;

const INDEX_CONTENT_TYPE: &str = "application/json";

/// Index contents plus the version they were read at (`None` when the document is absent).
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub entries: Vec<MediaAsset>,
    pub version: Option<ObjectVersion>,
}

/// Handle to the shared index document.
#[derive(Clone)]
pub struct MediaIndexHandle {
    storage: Arc<dyn Storage>,
    key: String,
}

impl MediaIndexHandle {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the index. A missing or unparsable document reads as empty; any other
    /// store failure is returned so a transient error never wipes the index.
    pub async fn load(&self) -> Result<IndexSnapshot, StorageError> {
        let stored = match self.storage.get(&self.key).await {
            Ok(stored) => stored,
            Err(StorageError::NotFound(_)) => return Ok(IndexSnapshot::default()),
            Err(e) => return Err(e),
        };

        let entries = match serde_json::from_slice::<Vec<MediaAsset>>(&stored.data) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Media index is not valid JSON, treating as empty");
                Vec::new()
            }
        };

        Ok(IndexSnapshot {
            entries,
            version: Some(stored.version),
        })
    }

    pub async fn store(
        &self,
        entries: &[MediaAsset],
        condition: PutCondition,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(entries).map_err(|e| {
            StorageError::BackendError(format!("Failed to serialize media index: {}", e))
        })?;
        self.storage
            .put(&self.key, Bytes::from(body), INDEX_CONTENT_TYPE, condition)
            .await?;
        Ok(())
    }
}

/// New entries first, then every existing entry whose id is not being replaced.
pub fn merge_entries(new_assets: &[MediaAsset], existing: Vec<MediaAsset>) -> Vec<MediaAsset> {
    let new_ids: HashSet<_> = new_assets.iter().map(|a| a.id).collect();
    let mut merged = Vec::with_capacity(new_assets.len() + existing.len());
    merged.extend_from_slice(new_assets);
    merged.extend(existing.into_iter().filter(|a| !new_ids.contains(&a.id)));
    merged
}

/// Merges newly uploaded assets into the index.
#[derive(Clone)]
pub struct IndexRegistrar {
    index: MediaIndexHandle,
    strategy: IndexWriteStrategy,
}

impl IndexRegistrar {
    pub fn new(index: MediaIndexHandle, strategy: IndexWriteStrategy) -> Self {
        Self { index, strategy }
    }

    pub async fn register(&self, new_assets: &[MediaAsset]) -> Result<(), AppError> {
        if new_assets.is_empty() {
            return Ok(());
        }

        match self.strategy {
            IndexWriteStrategy::Simple => self.register_simple(new_assets).await,
            IndexWriteStrategy::CompareAndSwap { max_attempts } => {
                self.register_cas(new_assets, max_attempts).await
            }
        }
    }

    /// Read, prepend, overwrite. Two registrations that both read before either
    /// writes lose one of the updates.
    async fn register_simple(&self, new_assets: &[MediaAsset]) -> Result<(), AppError> {
        let snapshot = self.index.load().await?;
        let merged = merge_entries(new_assets, snapshot.entries);
        self.index.store(&merged, PutCondition::Overwrite).await?;

        tracing::info!(
            key = %self.index.key(),
            added = new_assets.len(),
            total = merged.len(),
            "Media index updated"
        );
        Ok(())
    }

    /// Write back only if the document is unchanged since it was read, re-reading on conflict.
    async fn register_cas(
        &self,
        new_assets: &[MediaAsset],
        max_attempts: u32,
    ) -> Result<(), AppError> {
        for attempt in 1..=max_attempts {
            let snapshot = self.index.load().await?;
            let condition = match snapshot.version {
                Some(version) => PutCondition::IfMatch(version),
                None => PutCondition::IfAbsent,
            };
            let merged = merge_entries(new_assets, snapshot.entries);

            match self.index.store(&merged, condition).await {
                Ok(()) => {
                    tracing::info!(
                        key = %self.index.key(),
                        added = new_assets.len(),
                        total = merged.len(),
                        attempt,
                        "Media index updated"
                    );
                    return Ok(());
                }
                Err(StorageError::PreconditionFailed(_)) => {
                    tracing::debug!(key = %self.index.key(), attempt, "Media index changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(key = %self.index.key(), attempts = max_attempts, "Media index update kept losing races");
        Err(AppError::IndexContention {
            attempts: max_attempts,
        })
    }
}
