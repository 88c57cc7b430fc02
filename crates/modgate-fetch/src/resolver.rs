use std::sync::Arc;

use async_trait::async_trait;
use modgate_host::{HostClient, VersionInfo};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::assemble::{ArtifactAssembler, ArtifactBundle};
use crate::error::Result;
use crate::list::VersionEnumerator;
use crate::locator::Locator;
use crate::resolve::PathResolver;

/// The three module-protocol operations.
///
/// # Implementations
///
/// - [`HostResolver`]: modules hosted on a source host
/// - [`UpstreamResolver`](crate::UpstreamResolver): another module proxy
/// - [`Router`](crate::Router): picks one of the above per path
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Version and commit time of `path` at `query`.
    async fn query(&self, path: &str, query: &str) -> Result<VersionInfo>;

    /// Known versions of `path`.
    async fn list(&self, path: &str) -> Result<Vec<String>>;

    /// Info record, `go.mod` and archive of `path@version`, alive until
    /// `scope` ends.
    async fn download(
        &self,
        path: &str,
        version: &str,
        scope: &CancellationToken,
    ) -> Result<ArtifactBundle>;

    /// Where `path@query` lives on a source host, for resolvers that have one.
    async fn locate(&self, _path: &str, _query: &str) -> Result<Option<Locator>> {
        Ok(None)
    }
}

/// Serves modules straight from a source host.
pub struct HostResolver<H> {
    host:      Arc<H>,
    assembler: ArtifactAssembler<H>,
}

impl<H: HostClient + 'static> HostResolver<H> {
    pub fn new(host: H) -> Self {
        let host = Arc::new(host);
        Self {
            assembler: ArtifactAssembler::new(Arc::clone(&host)),
            host,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

#[async_trait]
impl<H: HostClient + 'static> Resolver for HostResolver<H> {
    async fn query(&self, path: &str, query: &str) -> Result<VersionInfo> {
        let locator = PathResolver::new(self.host.as_ref()).resolve(path, query).await?;

        info!(path, query, reference = locator.reference, "fetching tag from host");
        let mut tag = self.host.get_tag(&locator.repository, &locator.reference).await?;
        if !locator.sub_path.is_empty() {
            tag.version = locator.version().to_string();
        }
        Ok(tag)
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        info!(path, "listing versions from host");
        VersionEnumerator::new(self.host.as_ref()).list(path).await
    }

    async fn download(
        &self,
        path: &str,
        version: &str,
        scope: &CancellationToken,
    ) -> Result<ArtifactBundle> {
        self.assembler.download(path, version, scope).await
    }

    async fn locate(&self, path: &str, query: &str) -> Result<Option<Locator>> {
        PathResolver::new(self.host.as_ref())
            .resolve(path, query)
            .await
            .map(Some)
    }
}
