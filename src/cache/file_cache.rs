//! Path-addressed file cache
//!
//! Entries live under a cache root in the resource tree. Writing an entry
//! creates any missing folders between the root and the entry; purging
//! removes every direct child of the root and leaves the root in place.
//!
//! The cache borrows a resolver for each call and never opens or closes
//! one. Check-then-create is not locked: two writers materializing the same
//! folders race, and the store's `ResourceExists` is the only guard.

use crate::cache::purge::PurgeReport;
use crate::error::{TreeCacheError, TreeCacheResult};
use crate::filetype::{adapt_to_file_type, FileType, TypedFile};
use crate::store::{CachePath, NodeProperties, Resource, ResourcePath, ResourceResolver};
use tracing::{debug, info, warn};

/// File cache rooted at a fixed resource path
#[derive(Debug, Clone)]
pub struct FileCache {
    root: ResourcePath,
    display_name: String,
}

impl FileCache {
    pub fn new(root: ResourcePath, display_name: impl Into<String>) -> Self {
        Self {
            root,
            display_name: display_name.into(),
        }
    }

    /// Cache root path
    pub fn root(&self) -> &ResourcePath {
        &self.root
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Absolute path of an entry
    pub fn entry_path(&self, relative: &CachePath) -> ResourcePath {
        self.root.join(relative)
    }

    /// Write a text entry at `relative_path`
    ///
    /// Missing folders between the root and the entry are created first.
    /// Every failure, including a closed resolver, is a `CacheBuilder` error.
    pub async fn write_file(
        &self,
        resolver: Option<&dyn ResourceResolver>,
        relative_path: &str,
        content: &str,
        file_type: FileType,
    ) -> TreeCacheResult<()> {
        let builder_error = |reason: String| TreeCacheError::CacheBuilder {
            service: self.display_name.clone(),
            path: relative_path.to_string(),
            reason,
        };

        let relative = CachePath::parse(relative_path).map_err(|e| builder_error(e.to_string()))?;
        let target = self.entry_path(&relative);
        let parent_path = target
            .parent()
            .ok_or_else(|| builder_error("entry has no parent".to_string()))?;

        let resolver = match resolver {
            Some(resolver) if resolver.is_live() => resolver,
            _ => return Err(builder_error("closed service resource resolver".to_string())),
        };

        let existing_parent = resolver
            .get_resource(&parent_path)
            .await
            .map_err(|e| builder_error(e.to_string()))?;
        let parent = match existing_parent {
            Some(parent) => parent,
            None => self
                .materialize_path(resolver, &parent_path)
                .await
                .map_err(|e| builder_error(format!("cache root resource not found: {}", e)))?,
        };

        resolver
            .create(
                &parent,
                relative.name(),
                NodeProperties::text_file(file_type.output_content_type(), content),
            )
            .await
            .map_err(|e| builder_error(e.to_string()))?;
        resolver
            .commit()
            .await
            .map_err(|e| builder_error(e.to_string()))?;

        debug!(
            "{} cached {} ({})",
            self.display_name,
            target,
            file_type.output_content_type()
        );
        Ok(())
    }

    /// Read the entry at `relative_path` as `T`
    ///
    /// An absent or closed resolver reads as `NotFound`, like a miss.
    pub async fn read_file<T: TypedFile>(
        &self,
        resolver: Option<&dyn ResourceResolver>,
        relative_path: &str,
    ) -> TreeCacheResult<T> {
        let resolver = match resolver {
            Some(resolver) if resolver.is_live() => resolver,
            _ => {
                return Err(TreeCacheError::NotFound(format!(
                    "no service resolver to retrieve cached file {}",
                    relative_path
                )))
            }
        };

        let relative = CachePath::parse(relative_path)
            .map_err(|e| TreeCacheError::NotFound(e.to_string()))?;
        let target = self.entry_path(&relative);

        match resolver.get_resource(&target).await? {
            Some(resource) => adapt_to_file_type(resource),
            None => Err(TreeCacheError::NotFound(target.to_string())),
        }
    }

    /// Whether an entry exists at `relative_path`. Never fails.
    pub async fn is_cached(
        &self,
        resolver: Option<&dyn ResourceResolver>,
        relative_path: &str,
    ) -> bool {
        let Some(resolver) = resolver else {
            return false;
        };
        let Ok(relative) = CachePath::parse(relative_path) else {
            return false;
        };

        match resolver.get_resource(&self.entry_path(&relative)).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                debug!("Lookup of {} failed: {}", relative, e);
                false
            }
        }
    }

    /// Delete every direct child of the cache root
    ///
    /// The root must already exist. A child that cannot be deleted is
    /// recorded in the report and the purge carries on with its siblings.
    pub async fn purge_all(
        &self,
        resolver: Option<&dyn ResourceResolver>,
    ) -> TreeCacheResult<PurgeReport> {
        let resolver = match resolver {
            Some(resolver) if resolver.is_live() => resolver,
            _ => {
                return Err(TreeCacheError::CachePurge(format!(
                    "{} has no open service resource resolver",
                    self.display_name
                )))
            }
        };

        info!("{} purging cache.", self.display_name);
        let root = resolver
            .get_resource(&self.root)
            .await
            .map_err(|e| TreeCacheError::CachePurge(format!("{}: {}", self.display_name, e)))?
            .ok_or_else(|| {
                TreeCacheError::CachePurge(format!(
                    "{}: cache root resource {} not found",
                    self.display_name, self.root
                ))
            })?;

        let children = resolver
            .list_children(&root)
            .await
            .map_err(|e| TreeCacheError::CachePurge(format!("{}: {}", self.display_name, e)))?;

        let mut report = PurgeReport::new(resolver.user_id());
        for child in children {
            match resolver.delete(&child).await {
                Ok(()) => report.removed.push(child.path.to_string()),
                Err(e) => {
                    warn!("Unable to delete {} while purging cache: {}", child.path, e);
                    report.record_failure(&child.path, e);
                }
            }
        }

        if let Err(e) = resolver.commit().await {
            warn!("Commit after purging {} failed: {}", self.root, e);
            report.record_failure(&self.root, e);
        }

        info!(
            "{} purged cache: {} removed, {} failed",
            self.display_name,
            report.removed_count(),
            report.failed_count()
        );
        Ok(report)
    }

    /// Ensure a folder exists at every segment from the root down to `target`
    ///
    /// Existing nodes are reused; only missing segments are created. Returns
    /// the node at `target`. A target outside the cache root is refused.
    pub async fn materialize_path(
        &self,
        resolver: &dyn ResourceResolver,
        target: &ResourcePath,
    ) -> TreeCacheResult<Resource> {
        let segments = target
            .strip_prefix(&self.root)
            .ok_or_else(|| TreeCacheError::PathOutsideRoot {
                path: target.to_string(),
                root: self.root.to_string(),
            })?;

        let mut current = resolver
            .get_resource(&self.root)
            .await?
            .ok_or_else(|| TreeCacheError::NotFound(format!("cache root {}", self.root)))?;

        for segment in segments {
            let child_path = current.path.child(segment)?;
            current = match resolver.get_resource(&child_path).await? {
                Some(existing) => existing,
                None => {
                    debug!("Creating cache folder {}", child_path);
                    resolver
                        .create(&current, segment, NodeProperties::folder())
                        .await?
                }
            };
        }

        Ok(current)
    }
}
