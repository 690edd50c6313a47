//! Error types for treecache
//!
//! All modules use `TreeCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for treecache operations
pub type TreeCacheResult<T> = Result<T, TreeCacheError>;

/// All errors that can occur in treecache
#[derive(Error, Debug)]
pub enum TreeCacheError {
    // Cache errors
    #[error("{service} failed to create cache file for '{path}': {reason}")]
    CacheBuilder {
        service: String,
        path: String,
        reason: String,
    },

    #[error("Cached file not found: {0}")]
    NotFound(String),

    #[error("Cached file {path} cannot be read as {expected}: {reason}")]
    TypeMismatch {
        path: String,
        expected: String,
        reason: String,
    },

    #[error("Failed to purge cache: {0}")]
    CachePurge(String),

    // Store errors
    #[error("Resource resolver is closed")]
    ResolverClosed,

    #[error("Unable to open resource resolver for {user}: {reason}")]
    ResolverLogin { user: String, reason: String },

    #[error("Resource already exists: {0}")]
    ResourceExists(String),

    #[error("Persistence failure at {path}: {reason}")]
    Persistence { path: String, reason: String },

    // Path errors
    #[error("Invalid resource path '{path}': {reason}")]
    PathInvalid { path: String, reason: String },

    #[error("Path {path} is outside cache root {root}")]
    PathOutsideRoot { path: String, root: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl TreeCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a persistence error for a resource path
    pub fn persistence(path: impl ToString, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid path error
    pub fn path_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "not cached" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CachePurge(_) => Some("Provision the cache root with: treecache init"),
            Self::CacheBuilder { .. } => Some("Check that the cache root exists: treecache status"),
            Self::ResolverLogin { .. } => Some("Run: treecache init"),
            Self::ConfigInvalid { .. } => Some("Inspect the configuration with: treecache config show"),
            _ => None,
        }
    }
}
