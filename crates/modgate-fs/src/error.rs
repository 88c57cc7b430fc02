use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create scratch file: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to create scratch directory under '{path}': {source}")]
    TempDir { path: PathBuf, source: io::Error },

    #[error("scoped file '{0}' is already closed")]
    Closed(PathBuf),

    #[error("scoped files need a running tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) | Error::TempFile(e) => e,
            other => io::Error::other(other),
        }
    }
}
