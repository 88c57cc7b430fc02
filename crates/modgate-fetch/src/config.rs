use serde::{Deserialize, Serialize};

pub const DEFAULT_UPSTREAM: &str = "https://proxy.golang.org";

/// One source host serving every module path that starts with `mask`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// API root, e.g. `https://gitlab.example.com/api/v4`.
    pub endpoint:     String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub mask:         String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub proxy: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            proxy: DEFAULT_UPSTREAM.to_string(),
        }
    }
}
