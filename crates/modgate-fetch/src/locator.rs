use std::fmt;

use serde::Serialize;

/// Where a coordinate lives on the host.
///
/// `reference` is always a tag naming a semantic version. For modules in a
/// subdirectory it is `<sub_path>/<version>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub repository: String,
    pub sub_path:   String,
    pub reference:  String,
}

impl Locator {
    /// A module at the repository root.
    pub fn root(repository: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            sub_path:   String::new(),
            reference:  version.into(),
        }
    }

    /// A module in `sub_path`, tagged `<sub_path>/<version>`.
    pub fn nested(repository: impl Into<String>, sub_path: impl Into<String>, version: &str) -> Self {
        let sub_path = sub_path.into();
        Self {
            repository: repository.into(),
            reference: format!("{sub_path}/{version}"),
            sub_path,
        }
    }

    /// The version named by the reference, without any subpath prefix.
    pub fn version(&self) -> &str {
        self.reference
            .rsplit_once('/')
            .map_or(self.reference.as_str(), |(_, last)| last)
    }

    /// Path of the module's `go.mod` inside the repository.
    pub fn manifest_path(&self) -> String {
        if self.sub_path.is_empty() {
            "go.mod".to_string()
        } else {
            format!("{}/go.mod", self.sub_path)
        }
    }

    /// Segments below the host export wrapper that belong to the subpath.
    pub fn depth(&self) -> usize {
        if self.sub_path.is_empty() {
            0
        } else {
            self.sub_path.matches('/').count() + 1
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub_path.is_empty() {
            write!(f, "{}@{}", self.repository, self.reference)
        } else {
            write!(f, "{}//{}@{}", self.repository, self.sub_path, self.reference)
        }
    }
}
