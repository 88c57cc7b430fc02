use std::io::{Seek, Write};

use async_trait::async_trait;
use futures_util::StreamExt;
use modgate_fs::ScopedFile;
use modgate_host::{USER_AGENT, VersionInfo};
use reqwest::Response;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::assemble::ArtifactBundle;
use crate::coordinate::{self, escape_path, escape_version};
use crate::error::{Artifact, Error, Result};
use crate::resolver::Resolver;

/// Query used to ask for the newest version.
pub const LATEST: &str = "latest";

/// Body chunks buffered between the network and the file writer.
const CHUNK_BACKLOG: usize = 16;

/// Serves modules from another module proxy over its HTTP protocol.
#[derive(Clone, Debug)]
pub struct UpstreamResolver {
    client: reqwest::Client,
    base:   String,
}

impl UpstreamResolver {
    pub fn new(proxy: &str) -> Result<Self> {
        let url = Url::parse(proxy).map_err(|e| Error::Config(format!("upstream proxy '{proxy}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!("upstream proxy '{proxy}' is not an HTTP URL")));
        }
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str, tail: &str) -> Result<String> {
        Ok(format!("{}/{}/{tail}", self.base, escape_path(path)?))
    }

    async fn get(&self, url: String) -> Result<Response> {
        debug!(url, "upstream request");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response)
    }

    /// Stream `url` into a scoped file. Chunks are handed to a blocking
    /// writer so file I/O stays off the runtime threads.
    async fn save(&self, url: String, artifact: Artifact, scope: &CancellationToken) -> Result<ScopedFile> {
        let fetch = async {
            let mut body = self.get(url).await?.bytes_stream();
            let file = ScopedFile::create(scope)?;
            let (chunks, mut received) = mpsc::channel::<bytes::Bytes>(CHUNK_BACKLOG);

            let writer = tokio::task::spawn_blocking(move || -> Result<ScopedFile> {
                let mut file = file;
                while let Some(chunk) = received.blocking_recv() {
                    file.write_all(&chunk)?;
                }
                file.rewind()?;
                Ok(file)
            });

            let streamed = async {
                while let Some(chunk) = body.next().await {
                    if chunks.send(chunk?).await.is_err() {
                        break;
                    }
                }
                Ok::<_, Error>(())
            }
            .await;
            drop(chunks);

            let file = writer.await.map_err(|e| Error::Task(e.to_string()))??;
            streamed?;
            Ok::<_, Error>(file)
        };
        fetch.await.map_err(|source| Error::Artifact {
            artifact,
            source: Box::new(source),
        })
    }
}

#[async_trait]
impl Resolver for UpstreamResolver {
    async fn query(&self, path: &str, query: &str) -> Result<VersionInfo> {
        let url = if query == LATEST {
            self.url(path, "@latest")?
        } else {
            self.url(path, &format!("@v/{}.info", escape_version(query)))?
        };
        let body = self.get(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let body = self.get(self.url(path, "@v/list")?).await?.text().await?;
        let versions: Vec<String> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.split_whitespace().next().unwrap_or(line).to_string())
            .collect();
        if versions.is_empty() {
            return Err(Error::NoMatchingVersions {
                path: path.to_string(),
            });
        }
        Ok(versions)
    }

    async fn download(
        &self,
        path: &str,
        version: &str,
        scope: &CancellationToken,
    ) -> Result<ArtifactBundle> {
        coordinate::check(path, version)?;
        info!(path, version, "downloading from upstream proxy");

        let escaped = escape_version(version);
        let scope = scope.child_token();
        let fetch = async {
            tokio::try_join!(
                self.save(self.url(path, &format!("@v/{escaped}.info"))?, Artifact::Info, &scope),
                self.save(self.url(path, &format!("@v/{escaped}.mod"))?, Artifact::Manifest, &scope),
                self.save(self.url(path, &format!("@v/{escaped}.zip"))?, Artifact::Archive, &scope),
            )
        };

        let outcome = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(Error::Cancelled),
            result = fetch => result,
        };
        match outcome {
            Ok((info, module, archive)) => Ok(ArtifactBundle {
                info,
                module,
                archive,
            }),
            Err(e) => {
                scope.cancel();
                Err(e)
            }
        }
    }
}
