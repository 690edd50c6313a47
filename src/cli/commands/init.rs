//! Init command - provision the store and the cache root
//!
//! The cache never creates its own root; this is the administrative step
//! that does.

use crate::config::{Config, ConfigManager};
use crate::error::{TreeCacheError, TreeCacheResult};
use crate::store::{
    FsResolverFactory, NodeProperties, ResolverFactory, ResourcePath, ResourceResolver,
};
use console::style;
use tracing::{debug, info};

/// Execute the init command
pub async fn execute(config: &Config) -> TreeCacheResult<()> {
    let factory = FsResolverFactory::new(ConfigManager::store_dir(config));
    factory.ensure_base_dir().await?;

    let root = config.cache.root()?;
    let resolver = factory.open(&config.cache.service_user).await?;
    let result = provision_folders(&*resolver, &root).await;
    factory.close(resolver);
    let created = result?;

    if created == 0 {
        println!(
            "{} Cache root {} already present in {}",
            style("✓").green(),
            root,
            factory.base_dir().display()
        );
    } else {
        println!(
            "{} Created cache root {} in {}",
            style("✓").green(),
            root,
            factory.base_dir().display()
        );
    }
    Ok(())
}

/// Create every missing folder down to `target`, returning how many were made
async fn provision_folders(
    resolver: &dyn ResourceResolver,
    target: &ResourcePath,
) -> TreeCacheResult<usize> {
    let mut current = resolver
        .get_resource(&ResourcePath::root())
        .await?
        .ok_or_else(|| TreeCacheError::Internal("store has no root node".to_string()))?;
    let mut created = 0;

    for segment in target.segments() {
        let child_path = current.path.child(segment)?;
        current = match resolver.get_resource(&child_path).await? {
            Some(existing) if existing.is_folder() => existing,
            Some(_) => {
                return Err(TreeCacheError::path_invalid(
                    child_path.to_string(),
                    "a file occupies this path",
                ))
            }
            None => {
                debug!("Provisioning {}", child_path);
                created += 1;
                resolver
                    .create(&current, segment, NodeProperties::folder())
                    .await?
            }
        };
    }

    resolver.commit().await?;
    info!("Provisioned {} ({} folders created)", target, created);
    Ok(created)
}
