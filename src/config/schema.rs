//! Configuration schema for treecache
//!
//! Configuration is stored at `~/.config/treecache/config.toml`

use crate::error::{TreeCacheError, TreeCacheResult};
use crate::store::ResourcePath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache service settings
    pub cache: CacheConfig,

    /// Backing store settings
    pub store: StoreConfig,
}

impl Config {
    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> TreeCacheResult<()> {
        self.cache.root()?;
        if self.cache.service_user.trim().is_empty() {
            return Err(TreeCacheError::User(
                "cache.service_user must not be empty".to_string(),
            ));
        }
        match self.general.log_format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(TreeCacheError::User(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                other
            ))),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Cache service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Absolute resource path of the cache root
    pub root_path: String,

    /// Service user the resolver is opened for
    pub service_user: String,

    /// Name used in logs and errors
    pub display_name: String,

    /// Number of purge records kept in memory
    pub purge_history_limit: usize,
}

impl CacheConfig {
    /// Parsed cache root. The tree root itself is refused.
    pub fn root(&self) -> TreeCacheResult<ResourcePath> {
        let root = ResourcePath::parse(&self.root_path)?;
        if root.is_root() {
            return Err(TreeCacheError::path_invalid(
                &self.root_path,
                "cache root cannot be the tree root",
            ));
        }
        Ok(root)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_path: "/var/treecache".to_string(),
            service_user: "treecache-service".to_string(),
            display_name: "File Cache".to_string(),
            purge_history_limit: 10,
        }
    }
}

/// Backing store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the filesystem store (defaults to the state directory)
    pub base_dir: Option<PathBuf>,
}
