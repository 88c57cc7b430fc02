use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::options::UnpackOptions;
use crate::report::UnpackReport;
use crate::sanitize::{resolve_within, strip_segments};

/// Extract a host archive export into `destination`.
///
/// Every entry loses its first `1 + skip_depth` path segments: the host's
/// wrapper directory plus the in-repository subdirectory of the module.
/// Entries that would land outside `destination` are skipped and listed in
/// the report. Existing files are never overwritten.
pub fn unpack(archive: &Path, destination: &Path, options: &UnpackOptions) -> Result<UnpackReport> {
    let file = File::open(archive).map_err(|e| Error::ExtractionFailed {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|_| Error::Corrupted)?;

    ensure_directory(destination)?;

    let strip = options.segments_to_strip();
    let mut report = UnpackReport::default();

    for index in 0..zip.len() {
        options.check_cancelled()?;

        let mut entry = zip.by_index(index).map_err(|_| Error::Corrupted)?;
        let name = entry.name().to_owned();

        let Some(relative) = strip_segments(&name, strip) else {
            report.stripped += 1;
            continue;
        };

        let target = match resolve_within(destination, relative) {
            Ok(target) => target,
            Err(e) => {
                warn!(entry = %name, error = %e, "skipping archive entry outside destination");
                report.rejected.push(name);
                continue;
            }
        };

        if entry.is_dir() {
            ensure_directory(&target)?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            ensure_directory(parent)?;
        }

        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| Error::ExtractionFailed {
                path: target.clone(),
                source: e,
            })?;
        let written = io::copy(&mut entry, &mut out).map_err(|e| Error::ExtractionFailed {
            path: target.clone(),
            source: e,
        })?;

        report.files += 1;
        report.total_bytes += written;
    }

    debug!(
        archive = %archive.display(),
        files = report.files,
        directories = report.directories,
        rejected = report.rejected.len(),
        "unpacked host archive"
    );
    Ok(report)
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path).map_err(|e| Error::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
