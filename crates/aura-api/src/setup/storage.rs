//! Storage setup and initialization

use anyhow::{Context, Result};
use aura_core::Config;
use aura_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing object storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize object storage")?;
    tracing::info!(
        backend = %storage.backend_type(),
        public_base = ?config.public_media_url(),
        "Object storage initialized"
    );
    Ok(storage)
}
