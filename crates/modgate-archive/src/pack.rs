use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Component, Path};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::options::PackOptions;
use crate::report::PackReport;

/// Upper bound on the summed size of all files in a module archive.
pub const MAX_ZIP_FILE: u64 = 500 << 20;

/// Upper bound on the size of the module's `go.mod`.
pub const MAX_GO_MOD: u64 = 16 << 20;

const VCS_DIRS: [&str; 4] = [".bzr", ".git", ".hg", ".svn"];

/// Build the canonical module archive from a directory tree.
///
/// Every entry is a regular file named `<module_path>@<version>/<relative>`.
/// Version-control metadata, nested modules (subdirectories with their own
/// `go.mod`) and vendored packages are left out.
pub fn pack_dir<W: Write + Seek>(
    dir: &Path,
    module_path: &str,
    version: &str,
    writer: W,
    options: &PackOptions,
) -> Result<PackReport> {
    let prefix = format!("{module_path}@{version}/");
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(writer);
    let mut report = PackReport::default();
    let mut walker = WalkDir::new(dir).follow_links(false).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        options.check_cancelled()?;

        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            let is_vcs = VCS_DIRS.iter().any(|vcs| entry.file_name() == *vcs);
            if is_vcs || entry.path().join("go.mod").is_file() {
                walker.skip_current_dir();
                report.skipped += 1;
            }
            continue;
        }
        if !file_type.is_file() {
            report.skipped += 1;
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|_| Error::InvalidPath(entry.path().to_path_buf()))?;
        let slash = to_slash(relative)?;
        if is_vendored_package(&slash) {
            report.skipped += 1;
            continue;
        }

        let size = entry.metadata()?.len();
        if slash == "go.mod" && size > MAX_GO_MOD {
            return Err(Error::TooLarge {
                path: slash,
                size,
                limit: MAX_GO_MOD,
            });
        }
        report.total_bytes += size;
        if report.total_bytes > MAX_ZIP_FILE {
            return Err(Error::TooLarge {
                path: dir.display().to_string(),
                size: report.total_bytes,
                limit: MAX_ZIP_FILE,
            });
        }

        let name = format!("{prefix}{slash}");
        zip.start_file(name.as_str(), file_options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        report.entries.push(name);
    }

    zip.finish()?;
    debug!(
        module = %module_path,
        version = %version,
        files = report.entries.len(),
        skipped = report.skipped,
        "built module archive"
    );
    Ok(report)
}

fn to_slash(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| Error::InvalidPath(relative.to_path_buf()))?,
            ),
            _ => return Err(Error::InvalidPath(relative.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

/// Files directly under a `vendor` directory are kept; packages below it are not.
fn is_vendored_package(name: &str) -> bool {
    let rest = if let Some(rest) = name.strip_prefix("vendor/") {
        rest
    } else if let Some(idx) = name.find("/vendor/") {
        &name[idx + "/vendor/".len()..]
    } else {
        return false;
    };
    rest.contains('/')
}
