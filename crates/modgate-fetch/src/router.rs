use std::sync::Arc;

use async_trait::async_trait;
use modgate_host::{GitLabClient, VersionInfo};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::assemble::ArtifactBundle;
use crate::config::{MaskConfig, UpstreamConfig};
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::resolver::{HostResolver, Resolver};
use crate::upstream::UpstreamResolver;

/// Routes every module path starting with `prefix` to `resolver`.
#[derive(Clone)]
pub struct Mask {
    pub prefix:   String,
    pub resolver: Arc<dyn Resolver>,
}

/// Picks one resolver per module path: the first matching mask in order,
/// else the default.
///
/// Immutable once built, so one instance can serve concurrent requests.
#[derive(Clone)]
pub struct Router {
    masks:   Vec<Mask>,
    default: Arc<dyn Resolver>,
}

impl Router {
    pub fn new(default: Arc<dyn Resolver>) -> Self {
        Self {
            masks: Vec::new(),
            default,
        }
    }

    pub fn with_mask(mut self, prefix: impl Into<String>, resolver: Arc<dyn Resolver>) -> Self {
        self.masks.push(Mask {
            prefix: prefix.into(),
            resolver,
        });
        self
    }

    /// One GitLab-backed mask per entry, in order, over an upstream proxy.
    pub fn from_config(masks: &[MaskConfig], upstream: &UpstreamConfig) -> Result<Self> {
        let mut router = Self::new(Arc::new(UpstreamResolver::new(&upstream.proxy)?));
        for mask in masks {
            if mask.mask.is_empty() {
                return Err(Error::Config(format!("mask for '{}' has an empty prefix", mask.endpoint)));
            }
            let client = GitLabClient::new(&mask.endpoint, mask.access_token.as_deref())?;
            info!(mask = mask.mask, endpoint = mask.endpoint, "registered host mask");
            router = router.with_mask(mask.mask.clone(), Arc::new(HostResolver::new(client)));
        }
        Ok(router)
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// The resolver serving `path`.
    pub fn route(&self, path: &str) -> &Arc<dyn Resolver> {
        self.find(path).unwrap_or(&self.default)
    }

    fn find(&self, path: &str) -> Option<&Arc<dyn Resolver>> {
        self.masks
            .iter()
            .find(|mask| path.starts_with(&mask.prefix))
            .map(|mask| &mask.resolver)
    }

    fn route_logged(&self, operation: &str, path: &str) -> &Arc<dyn Resolver> {
        self.find(path).unwrap_or_else(|| {
            info!(operation, path, "redirecting request to upstream");
            &self.default
        })
    }
}

#[async_trait]
impl Resolver for Router {
    async fn query(&self, path: &str, query: &str) -> Result<VersionInfo> {
        self.route_logged("query", path).query(path, query).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.route_logged("list", path).list(path).await
    }

    async fn download(
        &self,
        path: &str,
        version: &str,
        scope: &CancellationToken,
    ) -> Result<ArtifactBundle> {
        self.route_logged("download", path)
            .download(path, version, scope)
            .await
    }

    async fn locate(&self, path: &str, query: &str) -> Result<Option<Locator>> {
        self.route(path).locate(path, query).await
    }
}
