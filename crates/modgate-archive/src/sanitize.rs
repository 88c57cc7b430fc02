use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Drop `count` leading `/`-separated segments from an archive entry name.
///
/// Returns `None` when nothing is left, which happens exactly for the
/// stripped directories themselves.
pub fn strip_segments(name: &str, count: usize) -> Option<&str> {
    let mut rest = name;
    for _ in 0..count {
        let idx = rest.find('/')?;
        rest = &rest[idx + 1..];
    }
    (!rest.is_empty()).then_some(rest)
}

/// Join `relative` under `base` and make sure the result stays strictly
/// inside `base`.
pub fn resolve_within(base: &Path, relative: &str) -> Result<PathBuf> {
    let base = normalize_path(base);
    let resolved = normalize_path(&base.join(relative));

    if resolved == base || !resolved.starts_with(&base) {
        return Err(Error::ZipSlip {
            entry: PathBuf::from(relative),
            resolved,
        });
    }

    Ok(resolved)
}

/// Resolve `.` and `..` lexically without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::CurDir => {}
        }
    }

    result
}
