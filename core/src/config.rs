//! Dispatcher configuration (TOML, with environment overrides).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

pub const DEFAULT_LOG_FILTER: &str = "info,dispatch_core=debug";

/// Settings for the built-in transport, download sink and logging.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Where `DirectoryDownloads` saves exported files.
    pub download_dir: PathBuf,
    /// Sent as `User-Agent` when set.
    pub user_agent: Option<String>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            user_agent: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, DispatchError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DispatchError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `DISPATCH_DOWNLOAD_DIR` and `DISPATCH_USER_AGENT` from the
    /// process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(dir) = lookup("DISPATCH_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(user_agent) = lookup("DISPATCH_USER_AGENT") {
            self.user_agent = Some(user_agent);
        }
        self
    }
}
