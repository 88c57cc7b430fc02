use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use modgate_fetch::{MaskConfig, UpstreamConfig};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "MODGATE_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub masks:    Vec<MaskConfig>,
    pub upstream: UpstreamConfig,
    pub cache:    CacheConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enable: bool,
    pub dir:    PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: false,
            dir:    PathBuf::from(".modgate/cache"),
        }
    }
}

impl Config {
    /// Defaults, then `path` if it exists, then `MODGATE_*` variables
    /// (`MODGATE_UPSTREAM__PROXY` sets `upstream.proxy`).
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).merge(Env::prefixed(ENV_PREFIX).split("__")).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path))
    }

    /// A copy safe to print: access tokens are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for mask in &mut config.masks {
            if mask.access_token.is_some() {
                mask.access_token = Some("********".to_string());
            }
        }
        config
    }
}
