//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p aura-api`. Storage is an in-memory
//! object store; no external services are needed. The configured pandoc path does
//! not exist, so conversions go through the in-process fallback unless a test
//! supplies its own engines.

#![allow(dead_code)] // Each test binary uses a different subset of helpers

pub mod engines;
pub mod fixtures;
pub mod storage;

use aura_api::setup::{routes, services};
use aura_api::state::AppState;
use aura_core::{
    BaseConfig, Config, ConverterServiceConfig, IndexWriteStrategy, LogFormat, StorageBackend,
};
use aura_processing::{DocxEngine, EngineSelector};
use aura_storage::Storage;
use axum::Router;
use axum_test::TestServer;
use std::sync::Arc;

pub const PUBLIC_BASE_URL: &str = "https://cdn.test";
pub const MISSING_PANDOC: &str = "/nonexistent/aura-test/pandoc";
pub const INDEX_KEY: &str = "media/index.json";
pub const ASSET_NAMESPACE: &str = "uploads/pandoc";
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

pub fn test_config(strategy: IndexWriteStrategy) -> Config {
    Config(Box::new(ConverterServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            log_format: LogFormat::Compact,
        },
        storage_backend: Some(StorageBackend::Memory),
        s3_bucket: Some("test-bucket".to_string()),
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        public_media_url: Some(PUBLIC_BASE_URL.to_string()),
        local_storage_path: None,
        local_storage_base_url: None,
        max_upload_bytes: MAX_UPLOAD_BYTES,
        max_stored_source_bytes: 4 * MAX_UPLOAD_BYTES,
        pandoc_path: MISSING_PANDOC.to_string(),
        pandoc_timeout_secs: 10,
        fallback_converter_enabled: true,
        scratch_dir_prefix: "aura-test-".to_string(),
        asset_key_namespace: ASSET_NAMESPACE.to_string(),
        asset_name_prefix: "aura-pandoc-word".to_string(),
        media_index_key: INDEX_KEY.to_string(),
        index_write_strategy: strategy,
    }))
}

/// Test application: server plus the storage it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Keys stored under the asset namespace.
    pub async fn asset_keys(&self) -> Vec<String> {
        storage::list_keys(self.storage.as_ref(), ASSET_NAMESPACE).await
    }

    pub async fn index_entries(&self) -> Vec<aura_core::models::MediaAsset> {
        storage::read_index(self.storage.as_ref()).await
    }
}

/// Router exactly as the binary builds it, around the given storage and engines.
pub fn build_router(
    config: &Config,
    storage: Arc<dyn Storage>,
    engines: EngineSelector,
) -> (Arc<AppState>, Router) {
    let state = services::build_state(config, storage, engines);
    let router = routes::setup_routes(config, state.clone()).expect("routes");
    (state, router)
}

pub fn setup_test_app_with(
    config: Config,
    storage: Arc<dyn Storage>,
    engines: EngineSelector,
) -> TestApp {
    let (state, router) = build_router(&config, storage.clone(), engines);
    let server = TestServer::new(router).expect("Failed to create test server");
    TestApp {
        server,
        storage,
        state,
    }
}

/// Default app: in-memory storage, unavailable pandoc, real fallback engine.
pub fn setup_test_app() -> TestApp {
    let config = test_config(IndexWriteStrategy::Simple);
    let engines = services::build_engines(&config);
    setup_test_app_with(config, storage::memory(), engines)
}

/// Only the in-process engine; no process spawn is attempted.
pub fn setup_engines_fallback_only() -> EngineSelector {
    EngineSelector::new(Arc::new(DocxEngine::new()), None)
}
