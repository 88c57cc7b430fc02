use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::{Error, Result, SCRATCH_PREFIX};

/// A private working directory removed when dropped, whatever the outcome
/// of the work done inside it.
pub struct ScratchDir {
    root: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new() -> Result<Self> {
        Self::new_in(std::env::temp_dir())
    }

    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        let root = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| Error::TempDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        let path = root.path().to_path_buf();
        debug!(dir = %path.display(), "created scratch directory");

        Ok(Self {
            root: Some(root),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Create (if missing) and return a subdirectory.
    pub fn subdir(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = self.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the directory now, reporting failures instead of logging them.
    pub fn close(mut self) -> Result<()> {
        match self.root.take() {
            Some(root) => root.close().map_err(Error::from),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            if let Err(e) = root.close() {
                warn!(dir = %self.path.display(), error = %e, "failed to remove scratch directory");
            }
        }
    }
}
