//! Primary engine: the external `pandoc` executable.

mod process;

pub use process::{BoundedProcess, ProcessOutcome};

use crate::engine::ConversionEngine;
use crate::scratch::ScratchDir;
use crate::types::{
    AssetSink, ConversionError, ConversionOutput, EngineKind, ExtractedAsset, InputDocument,
};
use async_trait::async_trait;
use aura_core::models::{content_type_for_filename, file_extension};
use aura_storage::sanitize_token;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Subfolder (relative to the scratch root) pandoc extracts media into.
pub const MEDIA_DIR: &str = "media";
const OUTPUT_FILE: &str = "output.md";

pub struct PandocEngine {
    pandoc_path: PathBuf,
    timeout: Duration,
}

impl PandocEngine {
    pub fn new(pandoc_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            pandoc_path: pandoc_path.into(),
            timeout,
        }
    }

    /// Scratch file name for the input: sanitized source name, always ending in `.docx`.
    fn scratch_input_name(source_file_name: &str) -> String {
        let name = sanitize_token(source_file_name, "input", 80);
        if name.ends_with(".docx") {
            name
        } else {
            format!("{}.docx", name)
        }
    }
}

/// Every file below `dir`, depth-first, entries sorted by name within a directory.
fn list_files_sorted(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            list_files_sorted(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

async fn enumerate_media(root: &Path) -> Result<Vec<PathBuf>, ConversionError> {
    let media_root = root.join(MEDIA_DIR);
    if !tokio::fs::try_exists(&media_root).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let files = tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        list_files_sorted(&media_root, &mut files).map(|_| files)
    })
    .await
    .map_err(|e| ConversionError::Io(io::Error::new(io::ErrorKind::Other, e)))??;
    Ok(files)
}

/// Path relative to `root`, always with `/` separators.
fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ConversionEngine for PandocEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Pandoc
    }

    async fn convert(
        &self,
        input: &InputDocument,
        scratch: &ScratchDir,
        _sink: &mut dyn AssetSink,
    ) -> Result<ConversionOutput, ConversionError> {
        let root = scratch.path();
        let input_path = root.join(Self::scratch_input_name(&input.source_file_name));
        let output_path = root.join(OUTPUT_FILE);
        tokio::fs::write(&input_path, &input.bytes).await?;

        let start = std::time::Instant::now();
        let outcome = BoundedProcess::new(&self.pandoc_path, root, self.timeout)
            .arg(input_path.as_os_str())
            .args(["-f", "docx", "-t", "gfm", "--wrap=none"])
            .arg(format!("--extract-media={}", MEDIA_DIR))
            .arg("-o")
            .arg(output_path.as_os_str())
            .run()
            .await?;

        match outcome {
            ProcessOutcome::Success => {}
            ProcessOutcome::NotFound => {
                return Err(ConversionError::Unavailable {
                    engine: EngineKind::Pandoc,
                    reason: format!(
                        "Pandoc executable is not available: {}",
                        self.pandoc_path.display()
                    ),
                });
            }
            ProcessOutcome::ExitFailure { code, stderr } => {
                tracing::warn!(
                    exit_code = ?code,
                    stderr = %stderr,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Pandoc conversion failed"
                );
                let message = if stderr.is_empty() {
                    match code {
                        Some(code) => format!("pandoc failed with code {}", code),
                        None => "pandoc was terminated".to_string(),
                    }
                } else {
                    stderr
                };
                return Err(ConversionError::Content(message));
            }
        }

        let markdown = match tokio::fs::read_to_string(&output_path).await {
            Ok(markdown) => markdown,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConversionError::Content(
                    "pandoc exited successfully but produced no output".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        let mut extracted_assets = Vec::new();
        for path in enumerate_media(root).await? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = tokio::fs::read(&path).await?;
            extracted_assets.push(ExtractedAsset {
                relative_path: Some(relative_key(root, &path)),
                suggested_ext: file_extension(&name),
                content_type: content_type_for_filename(&name).to_string(),
                bytes: Bytes::from(bytes),
                name,
                origin: EngineKind::Pandoc,
            });
        }

        tracing::info!(
            engine = "pandoc",
            markdown_len = markdown.len(),
            asset_count = extracted_assets.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pandoc conversion finished"
        );

        Ok(ConversionOutput {
            markdown,
            extracted_assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::AppError;

    struct NullSink;

    #[async_trait]
    impl AssetSink for NullSink {
        async fn accept(&mut self, _asset: ExtractedAsset) -> Result<String, AppError> {
            Ok(String::new())
        }
    }

    fn input() -> InputDocument {
        InputDocument {
            bytes: Bytes::from_static(b"PK\x03\x04"),
            source_file_name: "Quarterly Report.docx".to_string(),
        }
    }

    #[test]
    fn test_scratch_input_name() {
        assert_eq!(
            PandocEngine::scratch_input_name("Quarterly Report.docx"),
            "quarterly-report.docx"
        );
        assert_eq!(PandocEngine::scratch_input_name("notes"), "notes.docx");
        assert_eq!(PandocEngine::scratch_input_name("日本語"), "input.docx");
    }

    #[test]
    fn test_media_enumeration_is_sorted_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir_all(media.join("media")).unwrap();
        std::fs::write(media.join("media/image2.png"), b"2").unwrap();
        std::fs::write(media.join("media/image1.png"), b"1").unwrap();
        std::fs::write(media.join("cover.jpg"), b"c").unwrap();

        let mut files = Vec::new();
        list_files_sorted(&media, &mut files).unwrap();
        let rel: Vec<_> = files.iter().map(|p| relative_key(dir.path(), p)).collect();
        assert_eq!(
            rel,
            vec!["media/cover.jpg", "media/media/image1.png", "media/media/image2.png"]
        );
    }

    #[tokio::test]
    async fn test_missing_pandoc_is_unavailable() {
        let engine = PandocEngine::new("/nonexistent/bin/pandoc", Duration::from_secs(5));
        let scratch = ScratchDir::create("aura-test-").unwrap();
        let err = engine
            .convert(&input(), &scratch, &mut NullSink)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_content_error() {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = tempfile::tempdir().unwrap();
        let script = bin_dir.path().join("fake-pandoc");
        std::fs::write(&script, "#!/bin/sh\necho 'Could not find document.xml' >&2\nexit 64\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = PandocEngine::new(&script, Duration::from_secs(5));
        let scratch = ScratchDir::create("aura-test-").unwrap();
        let err = engine
            .convert(&input(), &scratch, &mut NullSink)
            .await
            .unwrap_err();
        match err {
            ConversionError::Content(msg) => assert!(msg.contains("document.xml")),
            other => panic!("expected content error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_collects_media() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in for pandoc: writes markdown to the `-o` target and one image under media/.
        let bin_dir = tempfile::tempdir().unwrap();
        let script = bin_dir.path().join("fake-pandoc");
        std::fs::write(
            &script,
            "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n  shift\ndone\nmkdir -p media/media\nprintf 'png' > media/media/image1.png\nprintf '# Title\\n\\n![](media/media/image1.png)\\n' > \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = PandocEngine::new(&script, Duration::from_secs(5));
        let scratch = ScratchDir::create("aura-test-").unwrap();
        let output = engine
            .convert(&input(), &scratch, &mut NullSink)
            .await
            .unwrap();

        assert!(output.markdown.contains("![](media/media/image1.png)"));
        assert_eq!(output.extracted_assets.len(), 1);
        let asset = &output.extracted_assets[0];
        assert_eq!(asset.relative_path.as_deref(), Some("media/media/image1.png"));
        assert_eq!(asset.name, "image1.png");
        assert_eq!(asset.suggested_ext, "png");
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.bytes.as_ref(), b"png");
    }
}
