//! Aura Conversion Library
//!
//! This crate turns Word documents into GitHub-flavored markdown. The external
//! `pandoc` process is the primary engine; an in-process `.docx` reader takes over
//! when pandoc cannot be started.

pub mod engine;
pub mod scratch;
pub mod types;

#[cfg(feature = "pandoc")]
pub mod pandoc;

#[cfg(feature = "docx-fallback")]
pub mod docx;

// Re-export commonly used types
pub use engine::{ConversionEngine, EngineSelector};
pub use scratch::ScratchDir;
pub use types::{
    AssetSink, ConversionError, ConversionOutput, EngineKind, ExtractedAsset, InputDocument,
};

#[cfg(feature = "pandoc")]
pub use pandoc::{BoundedProcess, PandocEngine, ProcessOutcome, MEDIA_DIR};

#[cfg(feature = "docx-fallback")]
pub use docx::DocxEngine;
