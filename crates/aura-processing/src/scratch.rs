//! Scoped scratch directory for engines that work on the filesystem.

use std::io;
use std::path::Path;
use tempfile::TempDir;

/// A fresh temporary directory, removed recursively when dropped.
///
/// Dropping covers every exit path, including early returns through `?` and panics
/// that unwind. [`ScratchDir::close`] removes it eagerly and reports failures.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn create(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        tracing::debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "Removed scratch directory");
        Ok(())
    }
}
