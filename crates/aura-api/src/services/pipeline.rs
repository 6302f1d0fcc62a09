//! Conversion pipeline: convert, upload extracted assets, rewrite references,
//! register the new assets in the media index.

use crate::services::assets::{rewrite_references, AssetNaming, AssetUploader};
use crate::services::media_index::IndexRegistrar;
use aura_core::models::{ConvertResponse, MediaAsset, UploadedAsset};
use aura_core::AppError;
use aura_processing::{EngineKind, EngineSelector, InputDocument, ScratchDir};
use aura_storage::{document_token, Storage};
use std::sync::Arc;
use std::time::Instant;

struct PipelineOutcome {
    engine: EngineKind,
    markdown: String,
    uploaded: Vec<UploadedAsset>,
    added: Vec<MediaAsset>,
}

/// Everything one conversion needs, shared across requests.
#[derive(Clone)]
pub struct ConversionPipeline {
    storage: Arc<dyn Storage>,
    engines: EngineSelector,
    naming: AssetNaming,
    registrar: IndexRegistrar,
    scratch_prefix: String,
}

impl ConversionPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        engines: EngineSelector,
        naming: AssetNaming,
        registrar: IndexRegistrar,
        scratch_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            engines,
            naming,
            registrar,
            scratch_prefix: scratch_prefix.into(),
        }
    }

    /// Run one conversion end to end.
    ///
    /// The scratch directory is removed before returning on every path. Assets
    /// uploaded before a later failure are left in the store and are not indexed.
    pub async fn run(&self, input: InputDocument) -> Result<ConvertResponse, AppError> {
        let started = Instant::now();
        let scratch = ScratchDir::create(&self.scratch_prefix).map_err(|e| {
            AppError::Internal(format!("Failed to create scratch directory: {}", e))
        })?;

        let result = self.convert_and_upload(&input, &scratch).await;

        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "Failed to remove scratch directory");
        }

        let outcome = result?;
        self.registrar.register(&outcome.added).await?;

        tracing::info!(
            source = %input.source_file_name,
            engine = %outcome.engine,
            size_bytes = input.bytes.len(),
            uploaded_count = outcome.uploaded.len(),
            markdown_len = outcome.markdown.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Document converted"
        );

        Ok(ConvertResponse::new(outcome.markdown, outcome.uploaded))
    }

    async fn convert_and_upload(
        &self,
        input: &InputDocument,
        scratch: &ScratchDir,
    ) -> Result<PipelineOutcome, AppError> {
        let mut uploader = AssetUploader::new(
            self.storage.as_ref(),
            &self.naming,
            document_token(&input.source_file_name),
        );

        let (engine, output) = self.engines.convert(input, scratch, &mut uploader).await?;

        // Assets returned by the engine still sit at scratch-relative paths in the markdown.
        let mut markdown = output.markdown;
        for asset in &output.extracted_assets {
            let url = uploader.upload(asset).await?;
            if let Some(relative_path) = asset.relative_path.as_deref() {
                markdown = rewrite_references(&markdown, relative_path, &url);
            }
        }

        let (uploaded, added) = uploader.into_records();
        Ok(PipelineOutcome {
            engine,
            markdown,
            uploaded,
            added,
        })
    }
}
