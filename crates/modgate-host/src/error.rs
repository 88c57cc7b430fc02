//! Error types for modgate-host.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("not found on host: {what}")]
    NotFound { what: String },

    #[error("host returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid host endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("access token is not a valid header value")]
    InvalidToken,

    #[error("failed to decode host response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
