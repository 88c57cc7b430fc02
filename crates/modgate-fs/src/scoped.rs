use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{Error, Result, SCRATCH_PREFIX};

/// A scratch file whose lifetime is bound to a cancellation scope.
///
/// The backing file is deleted exactly once, by whichever comes first:
/// the scope being cancelled, an explicit [`ScopedFile::close`], or the
/// handle being dropped. Reads, writes and seeks after that fail.
pub struct ScopedFile {
    inner: Arc<Inner>,
}

struct Inner {
    path:     PathBuf,
    slot:     Mutex<Option<Backing>>,
    disposed: AtomicBool,
    /// Child of the owning scope; cancelled on dispose so the watcher exits.
    released: CancellationToken,
}

struct Backing {
    file: File,
    temp: TempPath,
}

impl Inner {
    fn backing(&self) -> MutexGuard<'_, Option<Backing>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` only for the call that actually removed the file.
    fn dispose(&self) -> io::Result<bool> {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        let backing = self.backing().take();
        self.released.cancel();

        match backing {
            Some(Backing { file, temp }) => {
                drop(file);
                temp.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl ScopedFile {
    /// Create an empty scoped file.
    ///
    /// Must be called from within a tokio runtime (blocking pool threads
    /// included); the watcher task is spawned on it.
    pub fn create(scope: &CancellationToken) -> Result<Self> {
        Self::create_in(scope, std::env::temp_dir())
    }

    /// Like [`ScopedFile::create`], with the backing file placed in `dir`.
    pub fn create_in(scope: &CancellationToken, dir: impl AsRef<Path>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (file, temp) = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempfile_in(dir)
            .map_err(Error::TempFile)?
            .into_parts();

        let inner = Arc::new(Inner {
            path:     temp.to_path_buf(),
            slot:     Mutex::new(Some(Backing { file, temp })),
            disposed: AtomicBool::new(false),
            released: scope.child_token(),
        });

        let watched = Arc::clone(&inner);
        runtime.spawn(async move {
            watched.released.cancelled().await;
            match watched.dispose() {
                Ok(true) => {
                    debug!(file = %watched.path.display(), "scope ended, removed scoped file")
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(file = %watched.path.display(), error = %e, "failed to remove scoped file")
                }
            }
        });

        debug!(file = %inner.path.display(), "created scoped file");
        Ok(Self { inner })
    }

    /// Copy `content` into a new scoped file and rewind it.
    pub fn save(scope: &CancellationToken, content: impl Read) -> Result<(Self, u64)> {
        Self::save_in(scope, std::env::temp_dir(), content)
    }

    pub fn save_in(
        scope: &CancellationToken,
        dir: impl AsRef<Path>,
        mut content: impl Read,
    ) -> Result<(Self, u64)> {
        let mut file = Self::create_in(scope, dir)?;
        let size = io::copy(&mut content, &mut file)?;
        file.rewind()?;
        Ok((file, size))
    }

    pub fn from_bytes(scope: &CancellationToken, bytes: &[u8]) -> Result<Self> {
        Self::save(scope, bytes).map(|(file, _)| file)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_closed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.with_file(|file| file.metadata().map(|m| m.len()))?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Delete the backing file now. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        self.inner.dispose()?;
        Ok(())
    }

    /// Read the whole file from the start, leaving the cursor at the end.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.rewind()?;
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self.inner.backing();
        match guard.as_mut() {
            Some(backing) => op(&mut backing.file),
            None => Err(Error::Closed(self.inner.path.clone()).into()),
        }
    }
}

impl Read for ScopedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_file(|file| file.read(buf))
    }
}

impl Write for ScopedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl Seek for ScopedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.with_file(|file| file.seek(pos))
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if let Err(e) = self.inner.dispose() {
            warn!(file = %self.inner.path.display(), error = %e, "failed to remove scoped file");
        }
    }
}

impl fmt::Debug for ScopedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedFile")
            .field("path", &self.inner.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
