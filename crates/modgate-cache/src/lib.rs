//! Artifact cache for module downloads.
//!
//! [`Cache`] is the storage interface the protocol layer reads from and
//! writes to. [`DirCache`] keeps objects on the local filesystem.
//!
//! Object names follow the module protocol layout, see [`names`].

mod content_type;
mod dir;
mod error;
pub mod names;

use std::io::Read;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use content_type::content_type;
pub use dir::DirCache;
pub use error::{Error, Result};

/// A stored object opened for reading.
pub struct CachedObject {
    pub content:       Box<dyn Read + Send>,
    pub last_modified: DateTime<Utc>,
    /// Quoted entity tag, e.g. `"9f86d0..."`.
    pub etag:          String,
    pub content_type:  String,
    pub size:          u64,
}

impl std::fmt::Debug for CachedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedObject")
            .field("last_modified", &self.last_modified)
            .field("etag", &self.etag)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Object storage for protocol artifacts.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Open `name`. A missing object is `Ok(None)`, never an error.
    async fn get(&self, name: &str) -> Result<Option<CachedObject>>;

    /// Store `content` under `name`, replacing any previous object.
    ///
    /// The content type is inferred from the name with [`content_type`].
    async fn put(&self, name: &str, content: Box<dyn Read + Send>) -> Result<()>;
}
