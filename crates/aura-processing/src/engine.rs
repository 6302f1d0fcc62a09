//! Conversion engine trait and primary/fallback selection.

use crate::scratch::ScratchDir;
use crate::types::{AssetSink, ConversionError, ConversionOutput, EngineKind, InputDocument};
use async_trait::async_trait;
use std::sync::Arc;

/// Converts a Word document to GitHub-flavored markdown.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Convert `input`.
    ///
    /// Engines may use `scratch` for intermediate files. Assets are either returned in
    /// [`ConversionOutput::extracted_assets`] or handed to `sink` as they are found,
    /// in which case the markdown already contains the sink's URLs.
    async fn convert(
        &self,
        input: &InputDocument,
        scratch: &ScratchDir,
        sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError>;
}

/// Runs the primary engine, and the fallback only when the primary is unavailable.
///
/// Content errors from the primary are returned as-is: a broken document must not be
/// retried on a different engine.
#[derive(Clone)]
pub struct EngineSelector {
    primary: Arc<dyn ConversionEngine>,
    fallback: Option<Arc<dyn ConversionEngine>>,
}

impl EngineSelector {
    pub fn new(
        primary: Arc<dyn ConversionEngine>,
        fallback: Option<Arc<dyn ConversionEngine>>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub async fn convert(
        &self,
        input: &InputDocument,
        scratch: &ScratchDir,
        sink: &mut dyn AssetSink,
    ) -> Result<(EngineKind, ConversionOutput), ConversionError> {
        let primary_kind = self.primary.kind();
        match self.primary.convert(input, scratch, sink).await {
            Ok(output) => Ok((primary_kind, output)),
            Err(err) if err.is_unavailable() => {
                let Some(fallback) = self.fallback.as_ref() else {
                    tracing::error!(engine = %primary_kind, error = %err, "Primary converter unavailable and no fallback configured");
                    return Err(err);
                };
                tracing::warn!(
                    engine = %primary_kind,
                    fallback = %fallback.kind(),
                    error = %err,
                    "Primary converter unavailable, using fallback"
                );
                let output = fallback.convert(input, scratch, sink).await?;
                Ok((fallback.kind(), output))
            }
            Err(err) => Err(err),
        }
    }
}
