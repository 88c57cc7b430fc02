//! Source-host API access.
//!
//! [`HostClient`] is the narrow interface module resolution needs from a
//! hosting service: project existence probes, tag listing and lookup, raw
//! file reads and repository archive exports. [`GitLabClient`] implements
//! it against the GitLab v4 REST API.

mod client;
mod error;
mod gitlab;
mod info;

pub use client::{BoxStream, ByteStream, HostClient};
pub use error::{HostError, Result};
pub use gitlab::{GitLabClient, USER_AGENT};
pub use info::VersionInfo;
