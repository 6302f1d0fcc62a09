//! Service initialization and application state setup

use crate::services::{
    AssetNaming, ConversionPipeline, IndexRegistrar, InputLimits, MediaIndexHandle,
};
use crate::state::{AppState, ConversionState};
use aura_core::Config;
use aura_processing::{ConversionEngine, DocxEngine, EngineSelector, PandocEngine};
use aura_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

/// Primary pandoc engine, plus the in-process fallback unless disabled.
pub fn build_engines(config: &Config) -> EngineSelector {
    let primary: Arc<dyn ConversionEngine> = Arc::new(PandocEngine::new(
        config.pandoc_path(),
        Duration::from_secs(config.pandoc_timeout_secs()),
    ));
    let fallback: Option<Arc<dyn ConversionEngine>> = if config.fallback_converter_enabled() {
        Some(Arc::new(DocxEngine::new()))
    } else {
        tracing::warn!("Fallback converter disabled; conversions fail when pandoc is unavailable");
        None
    };
    EngineSelector::new(primary, fallback)
}

/// Assemble [`AppState`] around a storage backend and a set of engines.
pub fn build_state(
    config: &Config,
    storage: Arc<dyn Storage>,
    engines: EngineSelector,
) -> Arc<AppState> {
    let naming = AssetNaming {
        namespace: config.asset_key_namespace().to_string(),
        name_prefix: config.asset_name_prefix().to_string(),
    };
    let registrar = IndexRegistrar::new(
        MediaIndexHandle::new(storage.clone(), config.media_index_key()),
        config.index_write_strategy(),
    );
    let pipeline = ConversionPipeline::new(
        storage.clone(),
        engines,
        naming,
        registrar,
        config.scratch_dir_prefix(),
    );

    Arc::new(AppState {
        config: config.clone(),
        storage: storage.clone(),
        conversion: ConversionState {
            pipeline: Arc::new(pipeline),
            storage,
            limits: InputLimits {
                max_upload_bytes: config.max_upload_bytes(),
                max_stored_source_bytes: config.max_stored_source_bytes(),
            },
        },
    })
}

pub fn initialize_services(config: &Config, storage: Arc<dyn Storage>) -> Arc<AppState> {
    let engines = build_engines(config);
    tracing::info!(
        pandoc_path = %config.pandoc_path(),
        pandoc_timeout_secs = config.pandoc_timeout_secs(),
        fallback_enabled = config.fallback_converter_enabled(),
        index_key = %config.media_index_key(),
        index_strategy = %config.index_write_strategy(),
        "Conversion services initialized"
    );
    build_state(config, storage, engines)
}
