use modgate_host::HostClient;
use tracing::debug;

use crate::coordinate::{escape_path, is_major_marker};
use crate::error::{Error, Result};
use crate::resolve::find_project;

/// Lists the versions of a module from the host's tags.
pub struct VersionEnumerator<'a, H> {
    host: &'a H,
}

impl<'a, H: HostClient> VersionEnumerator<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Versions of `path`, ascending as the host orders its tags.
    ///
    /// Tag prefixes are tried from the most to the least specific and the
    /// first one with any tags wins. A module at the repository root with no
    /// major-version marker unions its `v0.` and `v1.` tags instead.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        let escaped = escape_path(path)?;
        let segments: Vec<&str> = escaped.split('/').collect();
        let not_found = || Error::NoMatchingVersions {
            path: path.to_string(),
        };

        let (cursor, repository) = find_project(self.host, &segments).await?.ok_or_else(not_found)?;

        let mut tail = segments.len() - 1;
        let mut marker = None;
        if cursor < tail && is_major_marker(segments[tail]) {
            marker = Some(segments[tail]);
            tail -= 1;
        }
        let dirs = &segments[cursor + 1..=tail];
        let legacy = marker.is_none() && dirs.is_empty();

        let mut versions = Vec::new();
        for prefix in tag_prefixes(dirs, marker) {
            let tags = self.host.list_tags(&repository, &prefix).await?;
            if tags.is_empty() {
                debug!(repository, prefix, "no tags with prefix");
                continue;
            }

            versions.extend(tags.iter().map(|tag| tag.trailing_version().to_string()));
            if !legacy {
                break;
            }
        }

        if versions.is_empty() {
            return Err(not_found());
        }
        debug!(path, repository, count = versions.len(), "listed versions");
        Ok(versions)
    }
}

/// Tag-name prefixes to search, most specific first.
fn tag_prefixes(dirs: &[&str], marker: Option<&str>) -> Vec<String> {
    let nested = |suffix: &str| -> Vec<String> {
        (1..=dirs.len())
            .rev()
            .map(|end| format!("{}/{suffix}", dirs[..end].join("/")))
            .collect()
    };

    match (marker, dirs.is_empty()) {
        (Some(marker), false) => nested(marker),
        (Some(marker), true) => vec![marker.to_string()],
        (None, false) => nested("v"),
        (None, true) => vec!["v0.".to_string(), "v1.".to_string()],
    }
}
