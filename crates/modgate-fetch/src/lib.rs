//! Module resolution over a source host.
//!
//! Turns module coordinates (`path@version`) into host projects and tags,
//! lists versions from tags and assembles the protocol artifacts (info
//! record, `go.mod`, canonical zip) of a version.
//!
//! # Architecture
//!
//! - `coordinate.rs` - Path and version checks, case escaping
//! - `resolve.rs` - [`PathResolver`]: coordinate to [`Locator`]
//! - `list.rs` - [`VersionEnumerator`]: tag-prefix version listing
//! - `assemble.rs` - [`ArtifactAssembler`]: concurrent fail-fast download
//! - `resolver.rs` - [`Resolver`] operations and the host-backed implementation
//! - `upstream.rs` - [`UpstreamResolver`] for another module proxy
//! - `router.rs` - [`Router`]: prefix masks over a default resolver

pub use assemble::{ArtifactAssembler, ArtifactBundle};
pub use config::{DEFAULT_UPSTREAM, MaskConfig, UpstreamConfig};
pub use coordinate::{
    Coordinate, check, escape_path, escape_version, is_major_marker, split_major, unescape_path,
};
pub use error::{Artifact, Error, Result};
pub use list::VersionEnumerator;
pub use locator::Locator;
pub use modgate_host::VersionInfo;
pub use resolve::PathResolver;
pub use resolver::{HostResolver, Resolver};
pub use router::{Mask, Router};
pub use upstream::{LATEST, UpstreamResolver};

mod assemble;
mod config;
mod coordinate;
mod error;
mod list;
mod locator;
mod resolve;
mod resolver;
mod router;
mod upstream;
