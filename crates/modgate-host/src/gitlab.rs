use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::client::{ByteStream, HostClient};
use crate::error::{HostError, Result};
use crate::info::VersionInfo;

pub const USER_AGENT: &str = concat!("modgate/", env!("CARGO_PKG_VERSION"));

const PRIVATE_TOKEN: &str = "PRIVATE-TOKEN";
const PER_PAGE: usize = 100;

/// GitLab v4 REST API client.
///
/// `endpoint` is the API root, e.g. `https://gitlab.com/api/v4`. A non-empty
/// access token is sent as `PRIVATE-TOKEN` on every request.
#[derive(Clone, Debug)]
pub struct GitLabClient {
    client:   reqwest::Client,
    endpoint: Url,
}

#[derive(Deserialize)]
struct Tag {
    name:   String,
    commit: Commit,
}

#[derive(Deserialize)]
struct Commit {
    created_at: DateTime<FixedOffset>,
}

impl From<Tag> for VersionInfo {
    fn from(tag: Tag) -> Self {
        VersionInfo::new(tag.name, tag.commit.created_at.with_timezone(&Utc))
    }
}

impl GitLabClient {
    pub fn new(endpoint: &str, access_token: Option<&str>) -> Result<Self> {
        let parsed = Url::parse(endpoint).map_err(|e| HostError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason:   e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HostError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason:   "not a base URL".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(token).map_err(|_| HostError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(PRIVATE_TOKEN, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: parsed,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `<endpoint>/projects/<repository>/<tail...>`, each part escaped as one
    /// path segment so namespace slashes become `%2F`.
    fn project_url(&self, repository: &str, tail: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("projects").push(repository).extend(tail);
        }
        url
    }

    async fn send(&self, request: RequestBuilder, what: impl FnOnce() -> String) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HostError::NotFound { what: what() });
        }
        if !status.is_success() {
            return Err(HostError::Status {
                status: status.as_u16(),
                url:    response.url().to_string(),
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| HostError::Decode(e.to_string()))
    }
}

impl HostClient for GitLabClient {
    async fn list_tags(&self, repository: &str, prefix: &str) -> Result<Vec<VersionInfo>> {
        let url = self.project_url(repository, &["repository", "tags"]);
        let search = if prefix.is_empty() {
            String::new()
        } else {
            format!("^{prefix}")
        };

        let mut tags = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self.client.get(url.clone()).query(&[
                ("order_by", "version"),
                ("sort", "asc"),
                ("search", search.as_str()),
                ("page", page.to_string().as_str()),
                ("per_page", PER_PAGE.to_string().as_str()),
            ]);
            let response = self
                .send(request, || format!("project {repository}"))
                .await?;
            let batch: Vec<Tag> = Self::json(response).await?;
            let count = batch.len();
            tags.extend(batch.into_iter().map(VersionInfo::from));

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(repository, prefix, count = tags.len(), "listed tags");
        Ok(tags)
    }

    async fn get_tag(&self, repository: &str, tag: &str) -> Result<VersionInfo> {
        let url = self.project_url(repository, &["repository", "tags", tag]);
        let response = self
            .send(self.client.get(url), || format!("tag {tag} in {repository}"))
            .await?;
        let tag: Tag = Self::json(response).await?;
        Ok(tag.into())
    }

    async fn get_file(&self, repository: &str, path: &str, reference: &str) -> Result<Bytes> {
        let url = self.project_url(repository, &["repository", "files", path, "raw"]);
        let request = self.client.get(url).query(&[("ref", reference)]);
        let response = self
            .send(request, || format!("{path}@{reference} in {repository}"))
            .await?;
        Ok(response.bytes().await?)
    }

    async fn download(&self, repository: &str, dir: &str, reference: &str) -> Result<ByteStream> {
        let url = self.project_url(repository, &["repository", "archive.zip"]);
        let mut request = self.client.get(url).query(&[("sha", reference)]);
        if !dir.is_empty() {
            request = request.query(&[("path", dir)]);
        }
        let response = self
            .send(request, || format!("archive of {repository}@{reference}"))
            .await?;

        debug!(repository, dir, reference, "streaming archive export");
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(HostError::from));
        Ok(Box::pin(stream))
    }

    async fn is_project(&self, repository: &str) -> Result<bool> {
        let url = self.project_url(repository, &[]);
        match self.send(self.client.get(url), || format!("project {repository}")).await {
            Ok(_) => Ok(true),
            Err(HostError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
