mod common;

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeHost, module, sample_host};
use modgate_fetch::{Artifact, ArtifactAssembler, Error, VersionInfo};
use tokio_util::sync::CancellationToken;
use zip::ZipArchive;

async fn wait_removed(paths: &[PathBuf]) {
    for _ in 0..100 {
        if paths.iter().all(|path| !path.exists()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scoped files still on disk: {paths:?}");
}

fn entry_names(archive: Vec<u8>) -> Vec<String> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| {
            let entry = zip.by_index(i).unwrap();
            assert!(entry.enclosed_name().is_some(), "unsafe entry {}", entry.name());
            entry.name().to_string()
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn root_module_bundle() {
    let assembler = ArtifactAssembler::new(Arc::new(sample_host()));
    let scope = CancellationToken::new();
    let path = module("group/project");

    let mut bundle = assembler.download(&path, "v0.2.0", &scope).await.unwrap();

    let info: VersionInfo = serde_json::from_slice(&bundle.info.read_all().unwrap()).unwrap();
    assert_eq!(info.version, "v0.2.0");
    assert_eq!(info.time, common::commit_time());

    assert_eq!(
        bundle.module.read_all().unwrap(),
        b"module gitlab.example.com/group/project\n"
    );

    // .git is dropped and the pkg module is left to its own archive.
    let names = entry_names(bundle.archive.read_all().unwrap());
    assert_eq!(
        names,
        [
            "gitlab.example.com/group/project@v0.2.0/go.mod",
            "gitlab.example.com/group/project@v0.2.0/internal/util.go",
            "gitlab.example.com/group/project@v0.2.0/main.go",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_module_bundle() {
    let assembler = ArtifactAssembler::new(Arc::new(sample_host().hostile_export()));
    let scope = CancellationToken::new();
    let path = module("group/project/pkg/str/v2");

    let mut bundle = assembler.download(&path, "v2.0.2", &scope).await.unwrap();

    let info: VersionInfo = serde_json::from_slice(&bundle.info.read_all().unwrap()).unwrap();
    assert_eq!(info.version, "v2.0.2");

    let prefix = format!("{path}@v2.0.2/");
    let names = entry_names(bundle.archive.read_all().unwrap());
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name| name.starts_with(&prefix)), "{names:?}");
    assert!(names.iter().all(|name| !name.contains("escape.txt")));
}

#[tokio::test(flavor = "multi_thread")]
async fn scope_end_removes_every_file() {
    let assembler = ArtifactAssembler::new(Arc::new(sample_host()));
    let scope = CancellationToken::new();

    let bundle = assembler
        .download(&module("group/project/pkg"), "v0.2.1", &scope)
        .await
        .unwrap();
    let paths: Vec<PathBuf> = [&bundle.info, &bundle.module, &bundle.archive]
        .iter()
        .map(|file| file.path().to_path_buf())
        .collect();
    assert!(paths.iter().all(|path| path.exists()));

    // Close one explicitly first; the scope still takes care of the rest.
    bundle.info.close().unwrap();
    assert!(!paths[0].exists());

    scope.cancel();
    wait_removed(&paths).await;
    assert!(bundle.module.is_closed());
    assert!(bundle.archive.is_closed());
}

#[tokio::test(flavor = "multi_thread")]
async fn manifest_failure_cancels_archive() {
    let host = Arc::new(
        sample_host()
            .broken_file("go.mod")
            .slow_download(Duration::from_secs(30)),
    );
    let assembler = ArtifactAssembler::new(Arc::clone(&host));
    let scope = CancellationToken::new();

    let started = std::time::Instant::now();
    let error = assembler
        .download(&module("group/project"), "v0.2.0", &scope)
        .await
        .unwrap_err();

    assert_eq!(error.artifact(), Some(Artifact::Manifest));
    assert!(matches!(error, Error::Artifact { ref source, .. } if matches!(**source, Error::Host(_))));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!host.download_done.load(Ordering::SeqCst));
    assert!(!scope.is_cancelled(), "the caller's scope is left alone");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_download_leaves_no_files_behind() {
    let mut files: Vec<(String, String)> = (0..20_000)
        .map(|i| (format!("gen/{:03}/file{i}.go", i % 500), "package gen\n".to_string()))
        .collect();
    files.push(("go.mod".to_string(), "module gitlab.example.com/group/project\n".to_string()));
    let files: Vec<(&str, &str)> = files.iter().map(|(p, b)| (p.as_str(), b.as_str())).collect();

    // go.mod fails while the archive is being repacked.
    let host = FakeHost::new()
        .project("group/project")
        .tag("group/project", "v1.0.0", &files)
        .broken_file("go.mod")
        .slow_files(Duration::from_millis(100));
    let scratch = tempfile::tempdir().unwrap();
    let assembler = ArtifactAssembler::new(Arc::new(host)).with_scratch_dir(scratch.path());
    let scope = CancellationToken::new();

    let error = assembler
        .download(&module("group/project"), "v1.0.0", &scope)
        .await
        .unwrap_err();
    assert_eq!(error.artifact(), Some(Artifact::Manifest));

    let leftover: Vec<PathBuf> = std::fs::read_dir(scratch.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert!(leftover.is_empty(), "left behind: {leftover:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_download_keeps_only_the_bundle() {
    let scratch = tempfile::tempdir().unwrap();
    let assembler = ArtifactAssembler::new(Arc::new(sample_host())).with_scratch_dir(scratch.path());
    let scope = CancellationToken::new();

    let bundle = assembler
        .download(&module("group/project"), "v0.2.0", &scope)
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 3);
    assert!(bundle.archive.path().starts_with(scratch.path()));

    bundle.close().unwrap();
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn caller_cancellation_aborts_download() {
    let host = Arc::new(sample_host().slow_download(Duration::from_secs(30)));
    let assembler = ArtifactAssembler::new(Arc::clone(&host));
    let scope = CancellationToken::new();

    let canceller = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let error = assembler
        .download(&module("group/project"), "v0.2.0", &scope)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Cancelled));
    assert!(!host.download_done.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolution_errors_are_not_wrapped() {
    let assembler = ArtifactAssembler::new(Arc::new(sample_host()));
    let scope = CancellationToken::new();

    let error = assembler
        .download(&module("group/project/internal"), "v0.2.0", &scope)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidSubpath { .. }));
    assert_eq!(error.artifact(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_tag_is_not_found() {
    let assembler = ArtifactAssembler::new(Arc::new(sample_host()));
    let scope = CancellationToken::new();

    let error = assembler
        .download(&module("group/project"), "v0.9.0", &scope)
        .await
        .unwrap_err();
    assert!(error.artifact().is_some());
    assert!(error.is_not_found());
}
