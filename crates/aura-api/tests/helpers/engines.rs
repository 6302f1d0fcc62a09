//! Conversion engine doubles.

use async_trait::async_trait;
use aura_processing::{
    AssetSink, ConversionEngine, ConversionError, ConversionOutput, EngineKind, ExtractedAsset,
    InputDocument, ScratchDir,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Behaves like pandoc: returns markdown pointing at scratch-relative media paths
/// and leaves the assets for the pipeline to upload.
pub struct ScriptedPandocEngine {
    pub markdown: String,
    pub assets: Vec<(String, &'static [u8])>,
}

impl ScriptedPandocEngine {
    pub fn new(markdown: &str, relative_paths: &[&str]) -> Self {
        Self {
            markdown: markdown.to_string(),
            assets: relative_paths
                .iter()
                .map(|p| (p.to_string(), b"\x89PNG\r\n\x1a\n".as_slice()))
                .collect(),
        }
    }
}

#[async_trait]
impl ConversionEngine for ScriptedPandocEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Pandoc
    }

    async fn convert(
        &self,
        _input: &InputDocument,
        _scratch: &ScratchDir,
        _sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError> {
        let extracted_assets = self
            .assets
            .iter()
            .map(|(relative_path, bytes)| {
                let name = relative_path
                    .rsplit('/')
                    .next()
                    .unwrap_or(relative_path)
                    .to_string();
                let suggested_ext = name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default();
                ExtractedAsset {
                    relative_path: Some(relative_path.clone()),
                    name,
                    bytes: Bytes::from_static(bytes),
                    suggested_ext,
                    content_type: "image/png".to_string(),
                    origin: EngineKind::Pandoc,
                }
            })
            .collect();
        Ok(ConversionOutput {
            markdown: self.markdown.clone(),
            extracted_assets,
        })
    }
}

/// Fails every conversion with a fixed error and counts calls.
pub struct FailingEngine {
    kind: EngineKind,
    unavailable: bool,
    pub calls: AtomicUsize,
}

impl FailingEngine {
    /// Pandoc that exits non-zero on the document.
    pub fn content_error() -> Arc<Self> {
        Arc::new(Self {
            kind: EngineKind::Pandoc,
            unavailable: false,
            calls: AtomicUsize::new(0),
        })
    }

    /// Pandoc that is not installed.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            kind: EngineKind::Pandoc,
            unavailable: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversionEngine for FailingEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn convert(
        &self,
        _input: &InputDocument,
        _scratch: &ScratchDir,
        _sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            Err(ConversionError::Unavailable {
                engine: self.kind,
                reason: "executable not found".to_string(),
            })
        } else {
            Err(ConversionError::Content(
                "pandoc: Couldn't parse docx file".to_string(),
            ))
        }
    }
}

/// Counts calls and delegates to an inner engine.
pub struct CountingEngine<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E: ConversionEngine> CountingEngine<E> {
    pub fn new(inner: E) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: ConversionEngine> ConversionEngine for CountingEngine<E> {
    fn kind(&self) -> EngineKind {
        self.inner.kind()
    }

    async fn convert(
        &self,
        input: &InputDocument,
        scratch: &ScratchDir,
        sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.convert(input, scratch, sink).await
    }
}
