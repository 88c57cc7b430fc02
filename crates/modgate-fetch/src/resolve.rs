use modgate_host::HostClient;
use tracing::debug;

use crate::coordinate::{self, is_major_marker};
use crate::error::{Error, Result};
use crate::locator::Locator;

/// Maps a coordinate onto a host project, an optional subdirectory and a tag.
pub struct PathResolver<'a, H> {
    host: &'a H,
}

impl<'a, H: HostClient> PathResolver<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Resolve `path` at `query` (a concrete version).
    ///
    /// The repository is the shortest path prefix the host reports as a
    /// project. Segments after it, minus a trailing major-version marker,
    /// name the module's subdirectory; the longest one that holds a
    /// `go.mod` under the tag `<subdir>/<query>` wins.
    pub async fn resolve(&self, path: &str, query: &str) -> Result<Locator> {
        coordinate::check(path, query)?;

        let segments: Vec<&str> = path.split('/').collect();
        let Some((cursor, repository)) = find_project(self.host, &segments).await? else {
            return Err(Error::RepositoryNotFound {
                path: path.to_string(),
            });
        };

        let mut tail = segments.len() - 1;
        if cursor < tail && is_major_marker(segments[tail]) {
            tail -= 1;
        }
        if cursor == tail {
            debug!(path, query, repository, "resolved to repository root");
            return Ok(Locator::root(repository, query));
        }

        let dirs = &segments[cursor + 1..=tail];
        for end in (1..=dirs.len()).rev() {
            let candidate = Locator::nested(repository.as_str(), dirs[..end].join("/"), query);
            match self
                .host
                .get_file(&repository, &candidate.manifest_path(), &candidate.reference)
                .await
            {
                Ok(_) => {
                    debug!(path, query, locator = %candidate, "resolved to subdirectory");
                    return Ok(candidate);
                }
                Err(e) if e.is_not_found() => {
                    debug!(
                        repository,
                        sub_path = candidate.sub_path,
                        reference = candidate.reference,
                        "no go.mod in subdirectory"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::InvalidSubpath {
            path: path.to_string(),
            repository,
        })
    }
}

/// Probe growing prefixes of `segments[1..]` (at least two segments long)
/// and return the first one the host knows as a project, with the index of
/// its last segment.
pub(crate) async fn find_project<H: HostClient>(
    host: &H,
    segments: &[&str],
) -> Result<Option<(usize, String)>> {
    for cursor in 2..segments.len() {
        let candidate = segments[1..=cursor].join("/");
        if host.is_project(&candidate).await? {
            return Ok(Some((cursor, candidate)));
        }
        debug!(candidate, "not a project");
    }
    Ok(None)
}
