//! Archive repackaging for module downloads.
//!
//! # Architecture
//!
//! - `sanitize.rs` - Entry name stripping and zip-slip prevention
//! - `unpack.rs` - Host export extraction with wrapper/subdirectory stripping
//! - `pack.rs` - Canonical `<module>@<version>/` archive creation
//! - `options.rs` - Cancellation-aware options for both directions

pub use error::{Error, Result};
pub use options::{PackOptions, UnpackOptions};
pub use pack::{MAX_GO_MOD, MAX_ZIP_FILE, pack_dir};
pub use report::{PackReport, UnpackReport};
pub use sanitize::{resolve_within, strip_segments};
pub use unpack::unpack;

mod error;
mod options;
mod pack;
mod report;
mod sanitize;
mod unpack;
