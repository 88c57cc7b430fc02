mod common;

use common::{FakeHost, module, sample_host};
use modgate_fetch::{Error, Locator, PathResolver};

#[tokio::test]
async fn repository_root() {
    let host = sample_host();
    let locator = PathResolver::new(&host)
        .resolve(&module("group/project"), "v0.2.0")
        .await
        .unwrap();

    assert_eq!(locator, Locator::root("group/project", "v0.2.0"));
    assert_eq!(host.probed(), ["group/project"]);
}

#[tokio::test]
async fn subdirectory_without_manifest_is_invalid() {
    let host = sample_host();
    let result = PathResolver::new(&host)
        .resolve(&module("group/project/internal/pkg"), "v0.2.0")
        .await;

    assert!(matches!(result, Err(Error::InvalidSubpath { ref repository, .. }) if repository == "group/project"));
    assert_eq!(
        *host.file_reads.lock().unwrap(),
        [
            "group/project:internal/pkg/go.mod@internal/pkg/v0.2.0",
            "group/project:internal/go.mod@internal/v0.2.0",
        ]
    );
}

#[tokio::test]
async fn nested_module() {
    let host = sample_host();
    let locator = PathResolver::new(&host)
        .resolve(&module("group/project/pkg"), "v0.2.1")
        .await
        .unwrap();

    assert_eq!(locator.repository, "group/project");
    assert_eq!(locator.sub_path, "pkg");
    assert_eq!(locator.reference, "pkg/v0.2.1");
}

#[tokio::test]
async fn major_marker_is_not_a_subdirectory() {
    let host = sample_host();
    let locator = PathResolver::new(&host)
        .resolve(&module("group/project/v2"), "v2.0.2")
        .await
        .unwrap();

    assert_eq!(locator, Locator::root("group/project", "v2.0.2"));
    assert!(host.file_reads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn nested_module_with_major_marker() {
    let host = sample_host();
    let locator = PathResolver::new(&host)
        .resolve(&module("group/project/pkg/str/v2"), "v2.0.2")
        .await
        .unwrap();

    assert_eq!(locator, Locator::nested("group/project", "pkg/str", "v2.0.2"));
}

#[tokio::test]
async fn longest_subdirectory_wins() {
    let host = sample_host();
    let locator = PathResolver::new(&host)
        .resolve(&module("group/project/pkg/sub"), "v0.2.1")
        .await
        .unwrap();

    // pkg/sub has no go.mod of its own, so it belongs to the pkg module.
    assert_eq!(locator, Locator::nested("group/project", "pkg", "v0.2.1"));
}

#[tokio::test]
async fn skips_groups_that_are_not_projects() {
    let host = FakeHost::new()
        .project("group/sub/project")
        .tag("group/sub/project", "v1.0.0", &[("go.mod", "module x\n")]);
    let locator = PathResolver::new(&host)
        .resolve(&module("group/sub/project"), "v1.0.0")
        .await
        .unwrap();

    assert_eq!(locator.repository, "group/sub/project");
    assert_eq!(host.probed(), ["group/sub", "group/sub/project"]);
}

#[tokio::test]
async fn unknown_repository() {
    let host = sample_host();
    let result = PathResolver::new(&host)
        .resolve(&module("elsewhere/project"), "v1.0.0")
        .await;
    assert!(matches!(result, Err(Error::RepositoryNotFound { .. })));
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn path_with_only_a_group_is_not_found() {
    let host = sample_host();
    let result = PathResolver::new(&host).resolve(&module("group"), "v1.0.0").await;
    assert!(matches!(result, Err(Error::RepositoryNotFound { .. })));
    assert!(host.probed().is_empty());
}

#[tokio::test]
async fn malformed_coordinate_is_rejected_before_probing() {
    let host = sample_host();
    let result = PathResolver::new(&host)
        .resolve(&module("group/project"), "latest")
        .await;

    assert!(matches!(result, Err(Error::InvalidCoordinate { .. })));
    assert!(host.probed().is_empty());
}

#[tokio::test]
async fn host_failures_are_not_treated_as_missing_manifests() {
    let host = sample_host().broken_file("pkg/go.mod");
    let result = PathResolver::new(&host)
        .resolve(&module("group/project/pkg"), "v0.2.1")
        .await;

    match result {
        Err(Error::Host(e)) => assert!(!e.is_not_found()),
        other => panic!("expected a host error, got {other:?}"),
    }
}
