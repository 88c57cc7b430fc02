use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one host tag: the version it names and its commit time.
///
/// Serializes as the module protocol's `.info` record
/// (`{"Version": ..., "Time": ...}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionInfo {
    pub version: String,
    pub time:    DateTime<Utc>,
}

impl VersionInfo {
    pub fn new(version: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            time,
        }
    }

    /// The version with any `subpath/` tag prefix removed.
    pub fn trailing_version(&self) -> &str {
        trailing_segment(&self.version)
    }
}

/// Everything after the last `/`, or the whole string.
pub(crate) fn trailing_segment(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, last)| last)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn serializes_protocol_shape() {
        let info = VersionInfo::new("v0.2.0", Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["Version"], "v0.2.0");
        assert_eq!(json["Time"], "2024-03-01T08:30:00Z");

        let back: VersionInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn trailing_version_drops_subpath() {
        let time = Utc::now();
        assert_eq!(VersionInfo::new("pkg/str/v2.0.2", time).trailing_version(), "v2.0.2");
        assert_eq!(VersionInfo::new("v1.0.0", time).trailing_version(), "v1.0.0");
    }
}
