use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("archive is corrupted")]
    Corrupted,

    #[error("zip-slip attack detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: PathBuf, resolved: PathBuf },

    #[error("path is not valid UTF-8: '{0}'")]
    InvalidPath(PathBuf),

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory: {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("'{path}' is too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("archive operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Self::Io(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
