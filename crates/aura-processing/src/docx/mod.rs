//! Fallback engine: reads `.docx` in-process.
//!
//! The package is checked against an expansion budget, then parsed with `rs_docx`
//! into a small rich-text AST on a blocking thread. Images
//! are then handed to the asset sink in the order the walk first met them, and the
//! sink's URLs are written straight into the rendered markdown.

mod ast;
mod package;
mod parser;
mod render;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use ast::{Block, DocumentAst, ImagePart, Inline, TextStyle};
pub use package::ExpansionLimits;
pub use parser::read_document;
pub use render::render_markdown;

use crate::engine::ConversionEngine;
use crate::scratch::ScratchDir;
use crate::types::{
    AssetSink, ConversionError, ConversionOutput, EngineKind, ExtractedAsset, InputDocument,
};
use async_trait::async_trait;
use aura_core::models::{content_type_for_filename, file_extension};
use bytes::Bytes;

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxEngine {
    limits: ExpansionLimits,
}

impl DocxEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ExpansionLimits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl ConversionEngine for DocxEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::DocxFallback
    }

    async fn convert(
        &self,
        input: &InputDocument,
        _scratch: &ScratchDir,
        sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError> {
        let start = std::time::Instant::now();
        let bytes = input.bytes.clone();
        let limits = self.limits;
        let document = tokio::task::spawn_blocking(move || read_document(bytes, limits))
            .await
            .map_err(|e| ConversionError::Content(format!("Fallback converter crashed: {}", e)))??;

        let mut image_urls = Vec::with_capacity(document.images.len());
        for image in document.images {
            let name = image
                .part_name
                .rsplit('/')
                .next()
                .unwrap_or(&image.part_name)
                .to_string();
            let asset = ExtractedAsset {
                relative_path: None,
                suggested_ext: file_extension(&name),
                content_type: content_type_for_filename(&name).to_string(),
                bytes: Bytes::from(image.bytes),
                name,
                origin: EngineKind::DocxFallback,
            };
            let url = sink.accept(asset).await.map_err(ConversionError::Sink)?;
            image_urls.push(url);
        }

        let markdown = render_markdown(&document.blocks, &image_urls);

        tracing::info!(
            engine = "docx-fallback",
            markdown_len = markdown.len(),
            asset_count = image_urls.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fallback conversion finished"
        );

        Ok(ConversionOutput {
            markdown,
            extracted_assets: Vec::new(),
        })
    }
}
