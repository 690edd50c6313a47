//! Resource tree persisted on disk
//!
//! Each node is a directory under the base directory. A node's metadata
//! lives in `.resource.json`; file nodes keep their body in `.content`.
//! A directory without metadata is read as a folder, so a tree provisioned
//! by hand (`mkdir -p`) is usable as-is.

use crate::error::{TreeCacheError, TreeCacheResult};
use crate::store::path::{validate_name, ResourcePath};
use crate::store::{NodeProperties, PrimaryType, ResolverFactory, Resource, ResourceResolver};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const METADATA_FILE: &str = ".resource.json";
const METADATA_TMP_FILE: &str = ".resource.json.tmp";
const CONTENT_FILE: &str = ".content";
/// Nodes are assembled under this name before being moved into place
const STAGING_PREFIX: &str = ".resource-staging-";

/// On-disk metadata document of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResourceMetadata {
    primary_type: PrimaryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    /// SHA256 of the content (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

/// Hex SHA256 of a file body
fn content_digest(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Write a complete node (body, then metadata) into `staging`
async fn stage_node(
    staging: &Path,
    metadata: &ResourceMetadata,
    data: Option<&str>,
) -> std::io::Result<()> {
    fs::create_dir(staging).await?;
    if let Some(data) = data {
        fs::write(staging.join(CONTENT_FILE), data).await?;
    }
    let json = serde_json::to_string_pretty(metadata)?;
    let tmp = staging.join(METADATA_TMP_FILE);
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, staging.join(METADATA_FILE)).await
}

/// Remove a staging directory left by a failed create
async fn discard(staging: &Path) {
    if let Err(e) = fs::remove_dir_all(staging).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove staging directory {}: {}", staging.display(), e);
        }
    }
}

/// Factory for resolvers over a directory tree
#[derive(Debug, Clone)]
pub struct FsResolverFactory {
    base_dir: PathBuf,
}

impl FsResolverFactory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding the tree root
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the base directory if missing
    pub async fn ensure_base_dir(&self) -> TreeCacheResult<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            TreeCacheError::io(
                format!("creating store directory {}", self.base_dir.display()),
                e,
            )
        })
    }
}

#[async_trait]
impl ResolverFactory for FsResolverFactory {
    async fn open(&self, service_user: &str) -> TreeCacheResult<Box<dyn ResourceResolver>> {
        match fs::metadata(&self.base_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(TreeCacheError::ResolverLogin {
                    user: service_user.to_string(),
                    reason: format!("{} is not a directory", self.base_dir.display()),
                })
            }
            Err(e) => {
                return Err(TreeCacheError::ResolverLogin {
                    user: service_user.to_string(),
                    reason: format!("store {} unavailable: {}", self.base_dir.display(), e),
                })
            }
        }

        let id = Uuid::new_v4();
        debug!(
            "Opened fs resolver {} for {} at {}",
            id,
            service_user,
            self.base_dir.display()
        );
        Ok(Box::new(FsResolver {
            id,
            user: service_user.to_string(),
            base_dir: self.base_dir.clone(),
            live: AtomicBool::new(true),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Session over a directory tree
#[derive(Debug)]
pub struct FsResolver {
    id: Uuid,
    user: String,
    base_dir: PathBuf,
    live: AtomicBool,
}

impl FsResolver {
    fn ensure_live(&self) -> TreeCacheResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(TreeCacheError::ResolverClosed)
        }
    }

    fn node_dir(&self, path: &ResourcePath) -> PathBuf {
        let mut dir = self.base_dir.clone();
        for segment in path.segments() {
            dir.push(segment);
        }
        dir
    }

    async fn load(&self, path: &ResourcePath) -> TreeCacheResult<Option<Resource>> {
        let dir = self.node_dir(path);
        let dir_meta = match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TreeCacheError::persistence(path, e)),
        };

        let metadata = match fs::read_to_string(dir.join(METADATA_FILE)).await {
            Ok(raw) => Some(
                serde_json::from_str::<ResourceMetadata>(&raw)
                    .map_err(|e| TreeCacheError::persistence(path, format!("bad metadata: {}", e)))?,
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(TreeCacheError::persistence(path, e)),
        };

        let Some(metadata) = metadata else {
            let created_at = dir_meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            return Ok(Some(Resource {
                path: path.clone(),
                primary_type: PrimaryType::Folder,
                content_type: None,
                data: None,
                created_by: String::new(),
                created_at,
            }));
        };

        let data = if metadata.primary_type == PrimaryType::File {
            let body = fs::read_to_string(dir.join(CONTENT_FILE))
                .await
                .map_err(|e| TreeCacheError::persistence(path, format!("reading content: {}", e)))?;
            Some(body)
        } else {
            None
        };

        Ok(Some(Resource {
            path: path.clone(),
            primary_type: metadata.primary_type,
            content_type: metadata.content_type,
            data,
            created_by: metadata.created_by,
            created_at: metadata.created_at,
        }))
    }
}

#[async_trait]
impl ResourceResolver for FsResolver {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn user_id(&self) -> &str {
        &self.user
    }

    async fn get_resource(&self, path: &ResourcePath) -> TreeCacheResult<Option<Resource>> {
        self.ensure_live()?;
        self.load(path).await
    }

    async fn list_children(&self, parent: &Resource) -> TreeCacheResult<Vec<Resource>> {
        self.ensure_live()?;
        let dir = self.node_dir(&parent.path);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| TreeCacheError::persistence(&parent.path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TreeCacheError::persistence(&parent.path, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_name(&name).is_err() {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(name);
            }
        }
        names.sort();

        let mut children = Vec::with_capacity(names.len());
        for name in names {
            let child = parent.path.child(&name)?;
            if let Some(resource) = self.load(&child).await? {
                children.push(resource);
            }
        }
        Ok(children)
    }

    async fn create(
        &self,
        parent: &Resource,
        name: &str,
        properties: NodeProperties,
    ) -> TreeCacheResult<Resource> {
        self.ensure_live()?;
        validate_name(name).map_err(|reason| TreeCacheError::persistence(&parent.path, reason))?;
        if parent.is_file() {
            return Err(TreeCacheError::persistence(
                &parent.path,
                "cannot create children under a file",
            ));
        }
        let path = parent.path.child(name)?;
        let dir = self.node_dir(&path);
        let staging = self
            .node_dir(&parent.path)
            .join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));

        let metadata = ResourceMetadata {
            primary_type: properties.primary_type,
            content_type: properties.content_type.clone(),
            created_by: self.user.clone(),
            created_at: Utc::now(),
            digest: properties.data.as_deref().map(content_digest),
        };
        if let Err(e) = stage_node(&staging, &metadata, properties.data.as_deref()).await {
            discard(&staging).await;
            return Err(TreeCacheError::persistence(&path, e));
        }

        // create_dir (not create_dir_all) so a concurrent creator loses cleanly
        if let Err(e) = fs::create_dir(&dir).await {
            discard(&staging).await;
            return Err(if e.kind() == ErrorKind::AlreadyExists {
                TreeCacheError::ResourceExists(path.to_string())
            } else {
                TreeCacheError::persistence(&path, e)
            });
        }

        // Replaces the empty claimed directory in one step
        if let Err(e) = fs::rename(&staging, &dir).await {
            discard(&staging).await;
            let _ = fs::remove_dir(&dir).await;
            return Err(TreeCacheError::persistence(&path, e));
        }

        debug!("Created {} ({})", path, metadata.primary_type);
        Ok(Resource {
            path,
            primary_type: metadata.primary_type,
            content_type: metadata.content_type,
            data: properties.data,
            created_by: metadata.created_by,
            created_at: metadata.created_at,
        })
    }

    async fn delete(&self, resource: &Resource) -> TreeCacheResult<()> {
        self.ensure_live()?;
        if resource.path.is_root() {
            return Err(TreeCacheError::persistence(
                &resource.path,
                "cannot delete the tree root",
            ));
        }
        fs::remove_dir_all(self.node_dir(&resource.path))
            .await
            .map_err(|e| TreeCacheError::persistence(&resource.path, e))
    }

    async fn commit(&self) -> TreeCacheResult<()> {
        // Writes are durable as they are made
        self.ensure_live()
    }

    fn close(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Closed fs resolver {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Box<dyn ResourceResolver> {
        FsResolverFactory::new(dir.path())
            .open("fs-test")
            .await
            .unwrap()
    }

    fn path(raw: &str) -> ResourcePath {
        ResourcePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn open_requires_base_dir() {
        let dir = TempDir::new().unwrap();
        let factory = FsResolverFactory::new(dir.path().join("missing"));
        let err = factory.open("svc").await.err().unwrap();
        assert!(matches!(err, TreeCacheError::ResolverLogin { .. }));

        factory.ensure_base_dir().await.unwrap();
        assert!(factory.open("svc").await.is_ok());
    }

    #[tokio::test]
    async fn plain_directories_are_folders() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("var/cache")).unwrap();
        let resolver = open(&dir).await;

        let node = resolver.get_resource(&path("/var/cache")).await.unwrap().unwrap();
        assert!(node.is_folder());
        assert!(resolver.get_resource(&path("/var/missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_roundtrip_with_digest() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        let resolver = open(&dir).await;
        let cache = resolver.get_resource(&path("/cache")).await.unwrap().unwrap();

        resolver
            .create(&cache, "site.css", NodeProperties::text_file("text/css", "a {}"))
            .await
            .unwrap();

        let file = resolver
            .get_resource(&path("/cache/site.css"))
            .await
            .unwrap()
            .unwrap();
        assert!(file.is_file());
        assert_eq!(file.data.as_deref(), Some("a {}"));
        assert_eq!(file.content_type.as_deref(), Some("text/css"));
        assert_eq!(file.created_by, "fs-test");

        let raw = std::fs::read_to_string(dir.path().join("cache/site.css/.resource.json")).unwrap();
        assert!(raw.contains(&content_digest("a {}")));
        assert!(!dir.path().join("cache/site.css/.resource.json.tmp").exists());
    }

    #[tokio::test]
    async fn create_existing_is_conflict() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/a")).unwrap();
        let resolver = open(&dir).await;
        let cache = resolver.get_resource(&path("/cache")).await.unwrap().unwrap();

        let err = resolver
            .create(&cache, "a", NodeProperties::folder())
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::ResourceExists(_)));
    }

    #[tokio::test]
    async fn children_sorted_and_metadata_hidden() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/b")).unwrap();
        std::fs::create_dir_all(dir.path().join("cache/a")).unwrap();
        std::fs::write(dir.path().join("cache/stray.txt"), "x").unwrap();
        let resolver = open(&dir).await;
        let cache = resolver.get_resource(&path("/cache")).await.unwrap().unwrap();

        let names: Vec<String> = resolver
            .list_children(&cache)
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn delete_removes_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/a/b")).unwrap();
        let resolver = open(&dir).await;
        let a = resolver.get_resource(&path("/cache/a")).await.unwrap().unwrap();

        resolver.delete(&a).await.unwrap();
        assert!(!dir.path().join("cache/a").exists());
        assert!(dir.path().join("cache").exists());
    }

    fn staging_leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(STAGING_PREFIX))
            .collect()
    }

    #[tokio::test]
    async fn relative_segments_never_leave_store() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        std::fs::create_dir_all(base.join("cache")).unwrap();
        std::fs::create_dir_all(dir.path().join("victim")).unwrap();
        let resolver = FsResolverFactory::new(&base).open("fs-test").await.unwrap();
        let root = resolver.get_resource(&ResourcePath::root()).await.unwrap().unwrap();

        assert!(ResourcePath::root().child("..").is_err());
        assert!(resolver
            .create(&root, "..", NodeProperties::folder())
            .await
            .is_err());
        assert!(resolver
            .create(&root, " cache", NodeProperties::folder())
            .await
            .is_err());
        assert!(dir.path().join("victim").is_dir());
    }

    #[tokio::test]
    async fn conflicting_create_leaves_no_staging() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/site.css")).unwrap();
        let resolver = open(&dir).await;
        let cache = resolver.get_resource(&path("/cache")).await.unwrap().unwrap();

        let err = resolver
            .create(&cache, "site.css", NodeProperties::text_file("text/css", "a {}"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::ResourceExists(_)));
        assert!(staging_leftovers(&dir.path().join("cache")).is_empty());
        assert!(!dir.path().join("cache/site.css/.content").exists());
    }

    #[tokio::test]
    async fn failed_create_leaves_no_node() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache/gone")).unwrap();
        let resolver = open(&dir).await;
        let gone = resolver.get_resource(&path("/cache/gone")).await.unwrap().unwrap();
        std::fs::remove_dir(dir.path().join("cache/gone")).unwrap();

        let err = resolver
            .create(&gone, "site.css", NodeProperties::text_file("text/css", "a {}"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::Persistence { .. }));
        assert!(resolver
            .get_resource(&path("/cache/gone/site.css"))
            .await
            .unwrap()
            .is_none());
        assert!(staging_leftovers(&dir.path().join("cache")).is_empty());
    }

    #[tokio::test]
    async fn staging_directories_are_hidden() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(cache_dir.join(format!("{}stale", STAGING_PREFIX))).unwrap();
        std::fs::create_dir_all(cache_dir.join("a")).unwrap();
        let resolver = open(&dir).await;
        let cache = resolver.get_resource(&path("/cache")).await.unwrap().unwrap();

        let children = resolver.list_children(&cache).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "a");
    }

    #[tokio::test]
    async fn closed_resolver_rejects_calls() {
        let dir = TempDir::new().unwrap();
        let resolver = open(&dir).await;
        resolver.close();
        assert!(matches!(
            resolver.commit().await.unwrap_err(),
            TreeCacheError::ResolverClosed
        ));
    }
}
