use std::fmt;
use std::io;

use modgate_host::HostError;

/// The artifact a failed download branch was producing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    Info,
    Manifest,
    Archive,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Manifest => "go.mod",
            Self::Archive => "archive",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid coordinate {path}@{version}: {reason}")]
    InvalidCoordinate {
        path:    String,
        version: String,
        reason:  String,
    },

    #[error("no project found for module path '{path}'")]
    RepositoryNotFound { path: String },

    #[error("project '{repository}' has no go.mod for module path '{path}'")]
    InvalidSubpath { path: String, repository: String },

    #[error("no matching versions for '{path}'")]
    NoMatchingVersions { path: String },

    #[error("failed to save {artifact}: {source}")]
    Artifact {
        artifact: Artifact,
        #[source]
        source:   Box<Error>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("upstream returned HTTP {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Archive(#[from] modgate_archive::Error),

    #[error(transparent)]
    Fs(#[from] modgate_fs::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(path: &str, version: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            path:    path.to_string(),
            version: version.to_string(),
            reason:  reason.into(),
        }
    }

    /// Whether a protocol layer should answer "not found" for this error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RepositoryNotFound { .. }
            | Self::InvalidSubpath { .. }
            | Self::NoMatchingVersions { .. } => true,
            Self::Upstream { status, .. } => matches!(status, 404 | 410),
            Self::Host(e) => e.is_not_found(),
            Self::Artifact { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// The artifact that failed, if this came out of a download.
    pub fn artifact(&self) -> Option<Artifact> {
        match self {
            Self::Artifact { artifact, .. } => Some(*artifact),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
