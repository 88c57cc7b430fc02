use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::content_type::content_type;
use crate::error::{Error, Result};
use crate::{Cache, CachedObject};

const OBJECTS: &str = "objects";
const META: &str = "meta";

/// Filesystem-backed [`Cache`].
///
/// ```text
/// <root>/objects/<name>        object bytes
/// <root>/meta/<name>.json      content type and entity tag
/// ```
///
/// Writes go to a temp file beside the target and are renamed into place,
/// so readers never observe a partial object.
#[derive(Clone, Debug)]
pub struct DirCache {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    content_type: String,
    etag:         String,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(OBJECTS).join(name))
    }

    fn meta_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(META).join(format!("{name}.json")))
    }

    fn get_blocking(&self, name: &str) -> Result<Option<CachedObject>> {
        let object = self.object_path(name)?;
        let mut file = match File::open(&object) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Ok(None);
        }
        let last_modified: DateTime<Utc> = metadata.modified()?.into();

        let meta = match fs::read(self.meta_path(name)?) {
            Ok(raw) => serde_json::from_slice::<Meta>(&raw).map_err(|source| Error::Metadata {
                name: name.to_string(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let (etag, _) = hash_copy(&mut file, &mut io::sink())?;
                file.rewind()?;
                Meta {
                    content_type: content_type(name).to_string(),
                    etag,
                }
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CachedObject {
            content: Box::new(file),
            last_modified,
            etag: meta.etag,
            content_type: meta.content_type,
            size: metadata.len(),
        }))
    }

    fn put_blocking(&self, name: &str, mut content: impl Read) -> Result<()> {
        let object = self.object_path(name)?;
        let (etag, size) = write_atomic(&object, |file| hash_copy(&mut content, file))?;

        let meta = Meta {
            content_type: content_type(name).to_string(),
            etag,
        };
        let raw = serde_json::to_vec(&meta).map_err(|source| Error::Metadata {
            name: name.to_string(),
            source,
        })?;
        write_atomic(&self.meta_path(name)?, |file| file.write_all(&raw))?;

        debug!(name, size, etag = %meta.etag, "stored cache object");
        Ok(())
    }
}

#[async_trait]
impl Cache for DirCache {
    async fn get(&self, name: &str) -> Result<Option<CachedObject>> {
        let cache = self.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || cache.get_blocking(&name))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    async fn put(&self, name: &str, content: Box<dyn Read + Send>) -> Result<()> {
        let cache = self.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || cache.put_blocking(&name, content))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

/// Object names are relative `/`-separated paths with no empty, `.` or
/// `..` segments.
fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return invalid("empty");
    }
    if name.contains('\\') || name.contains('\0') {
        return invalid("contains a backslash or NUL");
    }
    if name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return invalid("empty, '.' or '..' path segment");
    }
    Ok(())
}

/// Copy `reader` into `writer`, returning the quoted hex SHA-256 and byte count.
fn hash_copy(reader: &mut impl Read, writer: &mut impl Write) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok((format!("\"{}\"", hex::encode(hasher.finalize())), total))
}

fn write_atomic<T>(path: &Path, fill: impl FnOnce(&mut File) -> io::Result<T>) -> Result<T> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .ok_or_else(|| write_err(io::Error::other("no parent directory")))?;
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp.")
        .tempfile_in(parent)
        .map_err(write_err)?;
    let value = fill(tmp.as_file_mut()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(value)
}
