//! Types shared by every conversion engine.

use async_trait::async_trait;
use aura_core::AppError;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// A source document buffered in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub bytes: Bytes,
    pub source_file_name: String,
}

/// Which engine produced an output or an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Pandoc,
    DocxFallback,
}

impl EngineKind {
    /// Tag recorded on media index entries.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineKind::Pandoc => "pandoc",
            EngineKind::DocxFallback => "docx-fallback",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A binary embedded in the source document, pulled out during conversion.
#[derive(Debug, Clone)]
pub struct ExtractedAsset {
    /// Path the engine wrote into the markdown, relative to its scratch root
    /// (e.g. `media/media/image1.png`). `None` when the engine substituted the final
    /// URL itself.
    pub relative_path: Option<String>,
    /// Original file name of the asset inside the document.
    pub name: String,
    pub bytes: Bytes,
    /// Lowercase extension without the dot; may be empty.
    pub suggested_ext: String,
    pub content_type: String,
    pub origin: EngineKind,
}

/// Markdown plus the assets that still have to be delivered.
///
/// Engines that stream assets to an [`AssetSink`] while converting return an empty
/// `extracted_assets`; the order of the list is the order assets must be uploaded in.
#[derive(Debug, Clone, Default)]
pub struct ConversionOutput {
    pub markdown: String,
    pub extracted_assets: Vec<ExtractedAsset>,
}

/// Receives extracted assets and returns the final public URL for each.
#[async_trait]
pub trait AssetSink: Send {
    async fn accept(&mut self, asset: ExtractedAsset) -> Result<String, AppError>;
}

/// Conversion failure, classified so the selector can decide whether to fall back.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The engine cannot run in this environment (tool missing, not executable).
    #[error("{engine} converter is not available: {reason}")]
    Unavailable { engine: EngineKind, reason: String },

    /// The document could not be converted. Carries the engine's diagnostics.
    #[error("{0}")]
    Content(String),

    #[error("Scratch I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The asset sink failed; the sink's own error is surfaced unchanged.
    #[error(transparent)]
    Sink(AppError),
}

impl ConversionError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ConversionError::Unavailable { .. })
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Unavailable { engine, reason } => AppError::ConverterUnavailable(
                format!("{} converter is not available: {}", engine, reason),
            ),
            ConversionError::Content(msg) => AppError::Conversion(msg),
            ConversionError::Io(e) => AppError::Internal(format!("Scratch I/O failed: {}", e)),
            ConversionError::Sink(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::ErrorMetadata;

    #[test]
    fn test_conversion_error_mapping() {
        let err: AppError = ConversionError::Unavailable {
            engine: EngineKind::Pandoc,
            reason: "not found".to_string(),
        }
        .into();
        assert_eq!(err.http_status_code(), 503);

        let err: AppError = ConversionError::Content("bad zip".to_string()).into();
        assert_eq!(err.error_code(), "CONVERSION_FAILED");
        assert_eq!(err.client_message(), "bad zip");

        let err: AppError = ConversionError::Sink(AppError::KeyAllocationExhausted {
            base_name: "x".to_string(),
            attempts: 5,
        })
        .into();
        assert_eq!(err.error_code(), "KEY_ALLOCATION_EXHAUSTED");
    }

    #[test]
    fn test_engine_tags() {
        assert_eq!(EngineKind::Pandoc.tag(), "pandoc");
        assert_eq!(EngineKind::DocxFallback.to_string(), "docx-fallback");
    }
}
