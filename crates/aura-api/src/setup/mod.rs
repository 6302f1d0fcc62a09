//! Application setup and initialization
//!
//! Startup logic lives here rather than in main.rs so tests can build the same router.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use aura_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format(), config.environment());

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, storage);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
