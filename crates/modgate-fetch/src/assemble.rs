use std::future::Future;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use modgate_archive::{PackOptions, UnpackOptions, pack_dir, unpack};
use modgate_fs::{ScopedFile, ScratchDir};
use modgate_host::HostClient;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Artifact, Error, Result};
use crate::locator::Locator;
use crate::resolve::PathResolver;

/// The three protocol artifacts of one module version.
///
/// Each file lives until the scope passed to
/// [`ArtifactAssembler::download`] ends or it is closed.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub info:    ScopedFile,
    pub module:  ScopedFile,
    pub archive: ScopedFile,
}

impl ArtifactBundle {
    pub fn close(&self) -> Result<()> {
        self.info.close()?;
        self.module.close()?;
        self.archive.close()?;
        Ok(())
    }
}

/// First failure of a download, shared by its branches.
#[derive(Clone, Default)]
struct Failure(Arc<Mutex<Option<Error>>>);

impl Failure {
    /// Record `error` unless another branch got there first. Returns whether
    /// it was recorded.
    fn record(&self, artifact: Artifact, error: Error) -> bool {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(match error {
            Error::Cancelled => Error::Cancelled,
            source => Error::Artifact {
                artifact,
                source: Box::new(source),
            },
        });
        true
    }

    fn take(&self) -> Option<Error> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
    }
}

/// Builds the info record, `go.mod` and canonical archive of a module
/// version concurrently.
pub struct ArtifactAssembler<H> {
    host:    Arc<H>,
    scratch: PathBuf,
}

impl<H> Clone for ArtifactAssembler<H> {
    fn clone(&self) -> Self {
        Self {
            host:    Arc::clone(&self.host),
            scratch: self.scratch.clone(),
        }
    }
}

impl<H: HostClient + 'static> ArtifactAssembler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            scratch: std::env::temp_dir(),
        }
    }

    /// Place scoped files and working directories under `dir` instead of the
    /// system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch = dir.into();
        self
    }

    /// Resolve `path@version` and fetch its three artifacts.
    ///
    /// The branches share a child of `scope`. The first one to fail cancels
    /// it, which aborts the others and deletes every file they produced.
    /// Returns once all three have stopped.
    pub async fn download(
        &self,
        path: &str,
        version: &str,
        scope: &CancellationToken,
    ) -> Result<ArtifactBundle> {
        let locator = PathResolver::new(self.host.as_ref()).resolve(path, version).await?;
        info!(path, version, locator = %locator, "assembling module artifacts");

        let locator = Arc::new(locator);
        let scope = scope.child_token();
        let failure = Failure::default();

        let info = {
            let (host, locator, files) = (Arc::clone(&self.host), Arc::clone(&locator), scope.clone());
            let dir = self.scratch.clone();
            spawn_branch(Artifact::Info, &scope, &failure, async move {
                until_cancelled(&files, save_info(host.as_ref(), &locator, &dir, &files)).await
            })
        };
        let module = {
            let (host, locator, files) = (Arc::clone(&self.host), Arc::clone(&locator), scope.clone());
            let dir = self.scratch.clone();
            spawn_branch(Artifact::Manifest, &scope, &failure, async move {
                until_cancelled(&files, save_manifest(host.as_ref(), &locator, &dir, &files)).await
            })
        };
        let archive = {
            let (host, locator, files) = (Arc::clone(&self.host), Arc::clone(&locator), scope.clone());
            let (path, version, dir) = (path.to_string(), version.to_string(), self.scratch.clone());
            spawn_branch(Artifact::Archive, &scope, &failure, async move {
                save_archive(host.as_ref(), &locator, &path, &version, dir, &files).await
            })
        };

        let (info, module, archive) = tokio::join!(info, module, archive);
        match (failure.take(), settle(info), settle(module), settle(archive)) {
            (None, Ok(Some(info)), Ok(Some(module)), Ok(Some(archive))) => {
                debug!(path, version, "module artifacts ready");
                Ok(ArtifactBundle {
                    info,
                    module,
                    archive,
                })
            }
            (recorded, info, module, archive) => {
                scope.cancel();
                let error = recorded
                    .or_else(|| [info.err(), module.err(), archive.err()].into_iter().flatten().next())
                    .unwrap_or(Error::Cancelled);
                warn!(path, version, error = %error, "module download failed");
                Err(error)
            }
        }
    }
}

/// Run `work` on its own task. A failure is recorded and cancels the scope.
///
/// `work` must observe `scope` itself; the task is always driven to
/// completion.
fn spawn_branch<T: Send + 'static>(
    artifact: Artifact,
    scope: &CancellationToken,
    failure: &Failure,
    work: impl Future<Output = Result<T>> + Send + 'static,
) -> JoinHandle<Option<T>> {
    let scope = scope.clone();
    let failure = failure.clone();
    tokio::spawn(async move {
        match work.await {
            Ok(value) => Some(value),
            Err(error) => {
                if failure.record(artifact, error) {
                    debug!(%artifact, "branch failed, cancelling siblings");
                    scope.cancel();
                }
                None
            }
        }
    })
}

/// Race `work` against `scope`, dropping it on cancellation. Only for
/// futures that own no blocking work.
async fn until_cancelled<T>(scope: &CancellationToken, work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = scope.cancelled() => Err(Error::Cancelled),
        result = work => result,
    }
}

fn settle<T>(joined: std::result::Result<Option<T>, tokio::task::JoinError>) -> Result<Option<T>> {
    joined.map_err(|e| Error::Task(e.to_string()))
}

fn archive_error(error: modgate_archive::Error) -> Error {
    match error {
        modgate_archive::Error::Cancelled => Error::Cancelled,
        other => Error::Archive(other),
    }
}

async fn save_info<H: HostClient>(
    host: &H,
    locator: &Locator,
    dir: &Path,
    scope: &CancellationToken,
) -> Result<ScopedFile> {
    let mut info = host.get_tag(&locator.repository, &locator.reference).await?;
    if !locator.sub_path.is_empty() {
        info.version = locator.version().to_string();
    }
    let record = serde_json::to_vec(&info)?;
    let (file, _) = ScopedFile::save_in(scope, dir, record.as_slice())?;
    Ok(file)
}

async fn save_manifest<H: HostClient>(
    host: &H,
    locator: &Locator,
    dir: &Path,
    scope: &CancellationToken,
) -> Result<ScopedFile> {
    let manifest = host
        .get_file(&locator.repository, &locator.manifest_path(), &locator.reference)
        .await?;
    let (file, _) = ScopedFile::save_in(scope, dir, &manifest[..])?;
    Ok(file)
}

async fn fetch_export<H: HostClient>(host: &H, locator: &Locator, export: &Path) -> Result<u64> {
    let mut stream = host
        .download(&locator.repository, &locator.sub_path, &locator.reference)
        .await?;
    let mut file = tokio::fs::File::create(export).await?;
    let mut received = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(received)
}

/// Download the host export, strip it down to the module directory and
/// repack it as `<path>@<version>/...`.
///
/// The unpack and pack job is awaited even after `scope` is cancelled, so the
/// working directory is gone by the time this returns.
async fn save_archive<H: HostClient>(
    host: &H,
    locator: &Locator,
    path: &str,
    version: &str,
    dir: PathBuf,
    scope: &CancellationToken,
) -> Result<ScopedFile> {
    let scratch = ScratchDir::new_in(&dir)?;
    let export = scratch.join("archive.zip");

    let received = until_cancelled(scope, fetch_export(host, locator, &export)).await?;
    debug!(repository = locator.repository, bytes = received, "saved host export");

    let workspace = scratch.subdir("workspace")?;
    let depth = locator.depth();
    let (path, version, scope) = (path.to_string(), version.to_string(), scope.clone());

    tokio::task::spawn_blocking(move || -> Result<ScopedFile> {
        if scope.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let unpacked = unpack(
            &export,
            &workspace,
            &UnpackOptions::default().skip_depth(depth).cancel_on(scope.clone()),
        )
        .map_err(archive_error)?;
        if !unpacked.rejected.is_empty() {
            warn!(rejected = ?unpacked.rejected, "skipped archive entries outside the workspace");
        }

        let mut output = ScopedFile::create_in(&scope, &dir)?;
        let packed = pack_dir(
            &workspace,
            &path,
            &version,
            &mut output,
            &PackOptions::default().cancel_on(scope.clone()),
        )
        .map_err(archive_error)?;
        output.rewind()?;
        debug!(
            module = %format!("{path}@{version}"),
            entries = packed.entries.len(),
            skipped = packed.skipped,
            bytes = packed.total_bytes,
            "built module archive"
        );

        scratch.close()?;
        Ok(output)
    })
    .await
    .map_err(|e| Error::Task(e.to_string()))?
}
