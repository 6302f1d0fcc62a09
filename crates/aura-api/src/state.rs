//! Application state and sub-state extractors.
//!
//! Handlers extract only what they need via Axum's `FromRef`.

use crate::services::{ConversionPipeline, InputLimits};
use aura_core::Config;
use aura_storage::Storage;
use std::sync::Arc;

/// What the convert handler needs: the pipeline, the store that by-key sources are
/// read from, and the input ceilings applied before the pipeline runs.
#[derive(Clone)]
pub struct ConversionState {
    pub pipeline: Arc<ConversionPipeline>,
    pub storage: Arc<dyn Storage>,
    pub limits: InputLimits,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub conversion: ConversionState,
}

impl axum::extract::FromRef<Arc<AppState>> for ConversionState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.conversion.clone()
    }
}
