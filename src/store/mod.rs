//! Resource tree store abstraction
//!
//! The cache is layered over a tree of named nodes. A `ResolverFactory`
//! opens a `ResourceResolver` session for a service user; the resolver
//! fetches, lists, creates and deletes nodes and commits changes.
//!
//! Two backends ship with the crate:
//! - `MemoryResolverFactory`: shared in-memory tree, used by tests and embedders
//! - `FsResolverFactory`: tree persisted under a directory on disk

mod fs;
mod memory;
pub mod path;

pub use fs::{FsResolver, FsResolverFactory};
pub use memory::{MemoryResolver, MemoryResolverFactory};
pub use path::{CachePath, ResourcePath};

use crate::error::TreeCacheResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary type tag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryType {
    /// Container node preserving path structure
    #[serde(rename = "sling:Folder")]
    Folder,
    /// Leaf node holding text content
    #[serde(rename = "nt:file")]
    File,
}

impl fmt::Display for PrimaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder => write!(f, "sling:Folder"),
            Self::File => write!(f, "nt:file"),
        }
    }
}

/// Properties supplied when creating a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProperties {
    pub primary_type: PrimaryType,
    pub content_type: Option<String>,
    pub data: Option<String>,
}

impl NodeProperties {
    /// Properties for a container node
    pub fn folder() -> Self {
        Self {
            primary_type: PrimaryType::Folder,
            content_type: None,
            data: None,
        }
    }

    /// Properties for a text file node
    pub fn text_file(content_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            primary_type: PrimaryType::File,
            content_type: Some(content_type.into()),
            data: Some(data.into()),
        }
    }
}

/// Snapshot of a node as returned by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: ResourcePath,
    pub primary_type: PrimaryType,
    pub content_type: Option<String>,
    pub data: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Node name (empty for the tree root)
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    pub fn is_folder(&self) -> bool {
        self.primary_type == PrimaryType::Folder
    }

    pub fn is_file(&self) -> bool {
        self.primary_type == PrimaryType::File
    }
}

/// A session against the resource tree
///
/// Implementations must tolerate concurrent callers; the cache performs
/// no locking of its own.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Whether the session is still usable
    fn is_live(&self) -> bool;

    /// Service user the session was opened for
    fn user_id(&self) -> &str;

    /// Fetch a node, `None` when absent
    async fn get_resource(&self, path: &ResourcePath) -> TreeCacheResult<Option<Resource>>;

    /// Direct children of a node, in name order
    async fn list_children(&self, parent: &Resource) -> TreeCacheResult<Vec<Resource>>;

    /// Create a child node. Fails with `ResourceExists` if the name is taken.
    async fn create(
        &self,
        parent: &Resource,
        name: &str,
        properties: NodeProperties,
    ) -> TreeCacheResult<Resource>;

    /// Delete a node and everything beneath it
    async fn delete(&self, resource: &Resource) -> TreeCacheResult<()>;

    /// Persist pending changes
    async fn commit(&self) -> TreeCacheResult<()>;

    /// End the session. Further calls fail with `ResolverClosed`.
    fn close(&self);
}

/// Opens and closes resolver sessions
#[async_trait]
pub trait ResolverFactory: Send + Sync {
    /// Open a session for a service user
    async fn open(&self, service_user: &str) -> TreeCacheResult<Box<dyn ResourceResolver>>;

    /// Close a session previously returned by `open`
    fn close(&self, resolver: Box<dyn ResourceResolver>) {
        if resolver.is_live() {
            resolver.close();
        }
    }

    /// Human-readable backend name
    fn backend_name(&self) -> &'static str;
}
