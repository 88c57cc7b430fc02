#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use modgate_host::{ByteStream, HostClient, HostError, VersionInfo};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const HOST: &str = "gitlab.example.com";

pub fn commit_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
}

/// In-memory source host: projects, tags and one file tree per tag.
#[derive(Default)]
pub struct FakeHost {
    projects:          HashSet<String>,
    tags:              HashMap<String, Vec<String>>,
    trees:             HashMap<(String, String), BTreeMap<String, Vec<u8>>>,
    broken_files:      HashSet<String>,
    hostile_export:    bool,
    download_delay:    Option<Duration>,
    file_delay:        Option<Duration>,
    pub probes:        Mutex<Vec<String>>,
    pub file_reads:    Mutex<Vec<String>>,
    pub download_done: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, repository: &str) -> Self {
        self.projects.insert(repository.to_string());
        self
    }

    /// Tag `reference` in `repository` with the given file tree.
    pub fn tag(mut self, repository: &str, reference: &str, files: &[(&str, &str)]) -> Self {
        self.tags
            .entry(repository.to_string())
            .or_default()
            .push(reference.to_string());
        let tree = files
            .iter()
            .map(|(path, body)| (path.to_string(), body.as_bytes().to_vec()))
            .collect();
        self.trees
            .insert((repository.to_string(), reference.to_string()), tree);
        self
    }

    /// Every read of `path` fails with a server error.
    pub fn broken_file(mut self, path: &str) -> Self {
        self.broken_files.insert(path.to_string());
        self
    }

    /// Exports carry an extra entry that climbs out of the wrapper.
    pub fn hostile_export(mut self) -> Self {
        self.hostile_export = true;
        self
    }

    pub fn slow_download(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    /// Every file read answers after `delay`.
    pub fn slow_files(mut self, delay: Duration) -> Self {
        self.file_delay = Some(delay);
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    fn tree(&self, repository: &str, reference: &str) -> Result<&BTreeMap<String, Vec<u8>>, HostError> {
        self.trees
            .get(&(repository.to_string(), reference.to_string()))
            .ok_or_else(|| HostError::NotFound {
                what: format!("{repository}@{reference}"),
            })
    }

    fn export(&self, tree: &BTreeMap<String, Vec<u8>>, dir: &str) -> Vec<u8> {
        let wrapper = "project-0123abcd";
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.add_directory(format!("{wrapper}/"), options).unwrap();
        for (path, body) in tree {
            if !dir.is_empty() && !path.starts_with(&format!("{dir}/")) {
                continue;
            }
            zip.start_file(format!("{wrapper}/{path}"), options).unwrap();
            zip.write_all(body).unwrap();
        }
        if self.hostile_export {
            let nested = if dir.is_empty() { String::new() } else { format!("{dir}/") };
            zip.start_file(format!("{wrapper}/{nested}../../escape.txt"), options)
                .unwrap();
            zip.write_all(b"outside").unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

impl HostClient for FakeHost {
    async fn list_tags(&self, repository: &str, prefix: &str) -> Result<Vec<VersionInfo>, HostError> {
        let mut tags: Vec<VersionInfo> = self
            .tags
            .get(repository)
            .into_iter()
            .flatten()
            .filter(|name| name.starts_with(prefix))
            .map(|name| VersionInfo::new(name.clone(), commit_time()))
            .collect();
        tags.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(tags)
    }

    async fn get_tag(&self, repository: &str, tag: &str) -> Result<VersionInfo, HostError> {
        self.tree(repository, tag)?;
        Ok(VersionInfo::new(tag, commit_time()))
    }

    async fn get_file(&self, repository: &str, path: &str, reference: &str) -> Result<Bytes, HostError> {
        self.file_reads
            .lock()
            .unwrap()
            .push(format!("{repository}:{path}@{reference}"));
        if let Some(delay) = self.file_delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken_files.contains(path) {
            return Err(HostError::Status {
                status: 500,
                url:    format!("fake://{repository}/{path}"),
            });
        }
        self.tree(repository, reference)?
            .get(path)
            .map(|body| Bytes::from(body.clone()))
            .ok_or_else(|| HostError::NotFound {
                what: format!("{path}@{reference}"),
            })
    }

    async fn download(&self, repository: &str, dir: &str, reference: &str) -> Result<ByteStream, HostError> {
        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        let archive = self.export(self.tree(repository, reference)?, dir);
        self.download_done.store(true, Ordering::SeqCst);

        let (head, tail) = archive.split_at(archive.len() / 2);
        let chunks = vec![Ok(Bytes::copy_from_slice(head)), Ok(Bytes::copy_from_slice(tail))];
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }

    async fn is_project(&self, repository: &str) -> Result<bool, HostError> {
        self.probes.lock().unwrap().push(repository.to_string());
        Ok(self.projects.contains(repository))
    }
}

/// The `group/project` layout most tests use.
///
/// - `v0.1.0`, `v0.2.0`, `v1.0.0`: root module
/// - `pkg/v0.2.1`: nested module at `pkg`
/// - `pkg/str/v2.0.2`: nested v2 module at `pkg/str`
/// - `v2.0.2`: root module at major version 2
pub fn sample_host() -> FakeHost {
    let root_files: &[(&str, &str)] = &[
        ("go.mod", "module gitlab.example.com/group/project\n"),
        ("main.go", "package main\n"),
        ("internal/util.go", "package internal\n"),
        ("pkg/go.mod", "module gitlab.example.com/group/project/pkg\n"),
        ("pkg/pkg.go", "package pkg\n"),
        (".git/HEAD", "ref: refs/heads/main\n"),
    ];
    FakeHost::new()
        .project("group/project")
        .tag("group/project", "v0.1.0", root_files)
        .tag("group/project", "v0.2.0", root_files)
        .tag("group/project", "v1.0.0", root_files)
        .tag(
            "group/project",
            "pkg/v0.2.1",
            &[
                ("go.mod", "module gitlab.example.com/group/project\n"),
                ("pkg/go.mod", "module gitlab.example.com/group/project/pkg\n"),
                ("pkg/pkg.go", "package pkg\n"),
                ("pkg/sub/sub.go", "package sub\n"),
            ],
        )
        .tag(
            "group/project",
            "pkg/str/v2.0.2",
            &[
                ("pkg/str/go.mod", "module gitlab.example.com/group/project/pkg/str/v2\n"),
                ("pkg/str/str.go", "package str\n"),
            ],
        )
        .tag(
            "group/project",
            "v2.0.2",
            &[
                ("go.mod", "module gitlab.example.com/group/project/v2\n"),
                ("main.go", "package main\n"),
            ],
        )
}

pub fn module(path: &str) -> String {
    format!("{HOST}/{path}")
}
