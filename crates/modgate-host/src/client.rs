use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::Result;
use crate::info::VersionInfo;

/// A boxed stream type for archive bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Chunks of a repository archive export.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Source-host operations consumed by module resolution.
///
/// Repositories are addressed by their full namespace path
/// (`group/subgroup/project`). Implementations attach credentials and map
/// a missing resource to [`HostError::NotFound`](crate::HostError::NotFound)
/// so callers can tell it apart from transport or server failures.
///
/// # Implementations
///
/// - [`GitLabClient`](crate::GitLabClient): GitLab v4 REST API
/// - In-memory fakes for testing
pub trait HostClient: Send + Sync {
    /// Tags whose name starts with `prefix`, ascending by version.
    fn list_tags(
        &self,
        repository: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<VersionInfo>>> + Send;

    /// Look up one tag by its full name (`v1.2.3` or `sub/dir/v1.2.3`).
    fn get_tag(
        &self,
        repository: &str,
        tag: &str,
    ) -> impl Future<Output = Result<VersionInfo>> + Send;

    /// Raw bytes of `path` at `reference`.
    fn get_file(
        &self,
        repository: &str,
        path: &str,
        reference: &str,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// Zip export of `dir` (whole repository when empty) at `reference`.
    ///
    /// Entries are nested one level below a wrapper directory chosen by the host.
    fn download(
        &self,
        repository: &str,
        dir: &str,
        reference: &str,
    ) -> impl Future<Output = Result<ByteStream>> + Send;

    /// Whether `repository` names an existing project (as opposed to a
    /// group or nothing at all).
    fn is_project(&self, repository: &str) -> impl Future<Output = Result<bool>> + Send;
}
