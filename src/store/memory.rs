//! In-memory resource tree
//!
//! Every resolver opened by a `MemoryResolverFactory` shares the same tree,
//! the way sessions of one repository see the same content. The factory
//! also carries fault injection and bookkeeping used by tests.

use crate::error::{TreeCacheError, TreeCacheResult};
use crate::store::path::{validate_name, ResourcePath};
use crate::store::{NodeProperties, PrimaryType, ResolverFactory, Resource, ResourceResolver};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const SYSTEM_USER: &str = "system";

#[derive(Debug)]
struct TreeState {
    nodes: BTreeMap<ResourcePath, Resource>,
    failing_deletes: HashSet<ResourcePath>,
    fail_commits: bool,
    created: Vec<ResourcePath>,
    deleted: Vec<ResourcePath>,
    commits: usize,
}

impl TreeState {
    fn new() -> Self {
        let root = ResourcePath::root();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root.clone(),
            Resource {
                path: root,
                primary_type: PrimaryType::Folder,
                content_type: None,
                data: None,
                created_by: SYSTEM_USER.to_string(),
                created_at: Utc::now(),
            },
        );
        Self {
            nodes,
            failing_deletes: HashSet::new(),
            fail_commits: false,
            created: Vec::new(),
            deleted: Vec::new(),
            commits: 0,
        }
    }
}

/// Factory for resolvers over a shared in-memory tree
#[derive(Debug, Clone)]
pub struct MemoryResolverFactory {
    tree: Arc<RwLock<TreeState>>,
    refuse_login: Arc<AtomicBool>,
}

impl MemoryResolverFactory {
    /// Create a factory over an empty tree containing only `/`
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(TreeState::new())),
            refuse_login: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a folder and any missing ancestors, bypassing resolvers.
    ///
    /// Used to provision fixtures such as the cache root.
    pub fn ensure_folder(&self, path: &str) -> TreeCacheResult<()> {
        let target = ResourcePath::parse(path)?;
        let mut tree = self.tree.write();
        let mut current = ResourcePath::root();
        for segment in target.segments() {
            current = current.child(segment)?;
            if !tree.nodes.contains_key(&current) {
                tree.nodes.insert(
                    current.clone(),
                    Resource {
                        path: current.clone(),
                        primary_type: PrimaryType::Folder,
                        content_type: None,
                        data: None,
                        created_by: SYSTEM_USER.to_string(),
                        created_at: Utc::now(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Make deletion of `path` fail with a persistence error
    pub fn fail_delete_of(&self, path: &str) -> TreeCacheResult<()> {
        let path = ResourcePath::parse(path)?;
        self.tree.write().failing_deletes.insert(path);
        Ok(())
    }

    /// Make every commit fail (or succeed again)
    pub fn fail_commits(&self, fail: bool) {
        self.tree.write().fail_commits = fail;
    }

    /// Make `open` refuse new sessions
    pub fn refuse_login(&self, refuse: bool) {
        self.refuse_login.store(refuse, Ordering::SeqCst);
    }

    /// Paths created through resolvers, in creation order
    pub fn created_paths(&self) -> Vec<String> {
        self.tree.read().created.iter().map(ToString::to_string).collect()
    }

    /// Paths deleted through resolvers, in deletion order
    pub fn deleted_paths(&self) -> Vec<String> {
        self.tree.read().deleted.iter().map(ToString::to_string).collect()
    }

    /// Number of successful commits
    pub fn commit_count(&self) -> usize {
        self.tree.read().commits
    }

    /// Whether a node exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        ResourcePath::parse(path)
            .map(|p| self.tree.read().nodes.contains_key(&p))
            .unwrap_or(false)
    }

    /// Total number of nodes, including `/`
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.len()
    }
}

impl Default for MemoryResolverFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResolverFactory for MemoryResolverFactory {
    async fn open(&self, service_user: &str) -> TreeCacheResult<Box<dyn ResourceResolver>> {
        if self.refuse_login.load(Ordering::SeqCst) {
            return Err(TreeCacheError::ResolverLogin {
                user: service_user.to_string(),
                reason: "login refused".to_string(),
            });
        }
        Ok(Box::new(MemoryResolver::new(
            Arc::clone(&self.tree),
            service_user,
        )))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Session over the shared in-memory tree
#[derive(Debug)]
pub struct MemoryResolver {
    id: Uuid,
    user: String,
    live: AtomicBool,
    tree: Arc<RwLock<TreeState>>,
}

impl MemoryResolver {
    fn new(tree: Arc<RwLock<TreeState>>, user: &str) -> Self {
        let id = Uuid::new_v4();
        debug!("Opened memory resolver {} for {}", id, user);
        Self {
            id,
            user: user.to_string(),
            live: AtomicBool::new(true),
            tree,
        }
    }

    fn ensure_live(&self) -> TreeCacheResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(TreeCacheError::ResolverClosed)
        }
    }
}

#[async_trait]
impl ResourceResolver for MemoryResolver {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn user_id(&self) -> &str {
        &self.user
    }

    async fn get_resource(&self, path: &ResourcePath) -> TreeCacheResult<Option<Resource>> {
        self.ensure_live()?;
        Ok(self.tree.read().nodes.get(path).cloned())
    }

    async fn list_children(&self, parent: &Resource) -> TreeCacheResult<Vec<Resource>> {
        self.ensure_live()?;
        let tree = self.tree.read();
        Ok(tree
            .nodes
            .values()
            .filter(|node| node.path.parent().as_ref() == Some(&parent.path))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        parent: &Resource,
        name: &str,
        properties: NodeProperties,
    ) -> TreeCacheResult<Resource> {
        self.ensure_live()?;
        validate_name(name).map_err(|reason| TreeCacheError::persistence(&parent.path, reason))?;
        let path = parent.path.child(name)?;

        let mut tree = self.tree.write();
        match tree.nodes.get(&parent.path) {
            None => {
                return Err(TreeCacheError::persistence(
                    &path,
                    format!("parent {} does not exist", parent.path),
                ))
            }
            Some(node) if node.is_file() => {
                return Err(TreeCacheError::persistence(
                    &path,
                    format!("parent {} is a file", parent.path),
                ))
            }
            Some(_) => {}
        }
        if tree.nodes.contains_key(&path) {
            return Err(TreeCacheError::ResourceExists(path.to_string()));
        }

        let resource = Resource {
            path: path.clone(),
            primary_type: properties.primary_type,
            content_type: properties.content_type,
            data: properties.data,
            created_by: self.user.clone(),
            created_at: Utc::now(),
        };
        tree.nodes.insert(path.clone(), resource.clone());
        tree.created.push(path);
        Ok(resource)
    }

    async fn delete(&self, resource: &Resource) -> TreeCacheResult<()> {
        self.ensure_live()?;
        let target = &resource.path;
        if target.is_root() {
            return Err(TreeCacheError::persistence(target, "cannot delete the tree root"));
        }

        let mut tree = self.tree.write();
        if tree.failing_deletes.contains(target) {
            return Err(TreeCacheError::persistence(target, "delete rejected"));
        }
        if !tree.nodes.contains_key(target) {
            return Err(TreeCacheError::persistence(target, "resource does not exist"));
        }
        tree.nodes.retain(|path, _| !path.starts_with(target));
        tree.deleted.push(target.clone());
        Ok(())
    }

    async fn commit(&self) -> TreeCacheResult<()> {
        self.ensure_live()?;
        let mut tree = self.tree.write();
        if tree.fail_commits {
            return Err(TreeCacheError::persistence("/", "commit rejected"));
        }
        tree.commits += 1;
        Ok(())
    }

    fn close(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            debug!("Closed memory resolver {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(factory: &MemoryResolverFactory) -> Box<dyn ResourceResolver> {
        factory.open("test-user").await.unwrap()
    }

    async fn get(resolver: &dyn ResourceResolver, path: &str) -> Option<Resource> {
        resolver
            .get_resource(&ResourcePath::parse(path).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn root_always_exists() {
        let factory = MemoryResolverFactory::new();
        let resolver = open(&factory).await;
        let root = get(&*resolver, "/").await.unwrap();
        assert!(root.is_folder());
        assert_eq!(root.name(), "");
    }

    #[tokio::test]
    async fn create_and_list_children() {
        let factory = MemoryResolverFactory::new();
        factory.ensure_folder("/cache").unwrap();
        let resolver = open(&factory).await;
        let cache = get(&*resolver, "/cache").await.unwrap();

        resolver
            .create(&cache, "b.css", NodeProperties::text_file("text/css", "b"))
            .await
            .unwrap();
        resolver
            .create(&cache, "a", NodeProperties::folder())
            .await
            .unwrap();

        let names: Vec<String> = resolver
            .list_children(&cache)
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b.css"]);
        assert_eq!(factory.created_paths(), vec!["/cache/b.css", "/cache/a"]);

        let file = get(&*resolver, "/cache/b.css").await.unwrap();
        assert_eq!(file.created_by, "test-user");
    }

    #[tokio::test]
    async fn create_existing_fails() {
        let factory = MemoryResolverFactory::new();
        factory.ensure_folder("/cache/a").unwrap();
        let resolver = open(&factory).await;
        let cache = get(&*resolver, "/cache").await.unwrap();

        let err = resolver
            .create(&cache, "a", NodeProperties::folder())
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::ResourceExists(_)));
    }

    #[tokio::test]
    async fn create_rejects_relative_names() {
        let factory = MemoryResolverFactory::new();
        factory.ensure_folder("/cache").unwrap();
        let resolver = open(&factory).await;
        let cache = get(&*resolver, "/cache").await.unwrap();

        for name in ["..", ".", " a.css"] {
            assert!(resolver
                .create(&cache, name, NodeProperties::folder())
                .await
                .is_err());
        }
        assert!(factory.created_paths().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_subtree() {
        let factory = MemoryResolverFactory::new();
        factory.ensure_folder("/cache/a/b/c").unwrap();
        let resolver = open(&factory).await;
        let a = get(&*resolver, "/cache/a").await.unwrap();

        resolver.delete(&a).await.unwrap();

        assert!(factory.contains("/cache"));
        assert!(!factory.contains("/cache/a/b/c"));
        assert_eq!(factory.node_count(), 2);
    }

    #[tokio::test]
    async fn injected_delete_failure() {
        let factory = MemoryResolverFactory::new();
        factory.ensure_folder("/cache/a").unwrap();
        factory.fail_delete_of("/cache/a").unwrap();
        let resolver = open(&factory).await;
        let a = get(&*resolver, "/cache/a").await.unwrap();

        assert!(resolver.delete(&a).await.is_err());
        assert!(factory.contains("/cache/a"));
    }

    #[tokio::test]
    async fn closed_resolver_rejects_calls() {
        let factory = MemoryResolverFactory::new();
        let resolver = open(&factory).await;
        resolver.close();

        assert!(!resolver.is_live());
        let err = resolver
            .get_resource(&ResourcePath::root())
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::ResolverClosed));
    }

    #[tokio::test]
    async fn refused_login() {
        let factory = MemoryResolverFactory::new();
        factory.refuse_login(true);
        let err = factory.open("svc").await.err().unwrap();
        assert!(matches!(err, TreeCacheError::ResolverLogin { .. }));
    }

    #[tokio::test]
    async fn commit_counting_and_failure() {
        let factory = MemoryResolverFactory::new();
        let resolver = open(&factory).await;
        resolver.commit().await.unwrap();
        factory.fail_commits(true);
        assert!(resolver.commit().await.is_err());
        assert_eq!(factory.commit_count(), 1);
    }
}
