//! Scratch directories holding fixture documents.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary directory removed when dropped.
#[derive(Debug)]
pub struct Scratch {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Scratch {
    /// Create an empty scratch directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or its path is
    /// not valid UTF-8.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create scratch directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow!("scratch path is not UTF-8: {}", path.display()))?;
        Ok(Self { _dir: dir, root })
    }

    /// Directory holding the documents.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `contents` to `name` inside the directory, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.root.join(name);
        std::fs::write(&path, contents).with_context(|| format!("write {path}"))?;
        Ok(path)
    }
}
