use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid object name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("corrupted metadata for '{name}': {source}")]
    Metadata {
        name:   String,
        source: serde_json::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("cache task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
