//! Scope-bound scratch storage.
//!
//! - [`ScopedFile`] - a read/write/seek temp file deleted when its
//!   cancellation scope ends, when it is closed, or when it is dropped
//! - [`ScratchDir`] - a working directory removed on drop

mod error;
mod scoped;
mod scratch;

pub use error::{Error, Result};
pub use scoped::ScopedFile;
pub use scratch::ScratchDir;

/// Prefix for every file and directory this crate creates in the temp dir.
pub const SCRATCH_PREFIX: &str = "modgate-";
