//! Status command - report on the cache root and its entries

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::{Config, ConfigManager};
use crate::error::TreeCacheResult;
use crate::store::{FsResolverFactory, ResolverFactory, Resource, ResourceResolver};
use console::{style, Emoji};
use serde::Serialize;
use std::path::PathBuf;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");

#[derive(Debug, Serialize)]
struct CacheStatus {
    display_name: String,
    root: String,
    store_dir: PathBuf,
    store_available: bool,
    root_present: bool,
    entries: usize,
    folders: usize,
    total_bytes: usize,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> TreeCacheResult<()> {
    let status = collect(config).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print_status(&status),
    }
    Ok(())
}

async fn collect(config: &Config) -> TreeCacheResult<CacheStatus> {
    let root = config.cache.root()?;
    let store_dir = ConfigManager::store_dir(config);
    let mut status = CacheStatus {
        display_name: config.cache.display_name.clone(),
        root: root.to_string(),
        store_dir: store_dir.clone(),
        store_available: false,
        root_present: false,
        entries: 0,
        folders: 0,
        total_bytes: 0,
    };

    let factory = FsResolverFactory::new(store_dir);
    let Ok(resolver) = factory.open(&config.cache.service_user).await else {
        return Ok(status);
    };
    status.store_available = true;

    let result = match resolver.get_resource(&root).await {
        Ok(Some(root_node)) => {
            status.root_present = true;
            tally(&*resolver, root_node, &mut status).await
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };
    factory.close(resolver);
    result?;

    Ok(status)
}

/// Walk the tree beneath the root, counting files, folders and bytes
async fn tally(
    resolver: &dyn ResourceResolver,
    root: Resource,
    status: &mut CacheStatus,
) -> TreeCacheResult<()> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        for child in resolver.list_children(&node).await? {
            if child.is_file() {
                status.entries += 1;
                status.total_bytes += child.data.as_ref().map_or(0, String::len);
            } else {
                status.folders += 1;
                pending.push(child);
            }
        }
    }
    Ok(())
}

fn print_status(status: &CacheStatus) {
    println!("{}", style(format!("{} Status", status.display_name)).bold().cyan());
    println!();

    println!("{}", style("Store:").bold());
    if status.store_available {
        println!("  {}{}", CHECK, status.store_dir.display());
    } else {
        println!(
            "  {}{} {}",
            CROSS,
            status.store_dir.display(),
            style("(missing - run: treecache init)").dim()
        );
    }

    println!();
    println!("{}", style("Cache root:").bold());
    if status.root_present {
        println!("  {}{}", CHECK, status.root);
        println!(
            "  {} file(s) in {} folder(s), {} bytes",
            status.entries, status.folders, status.total_bytes
        );
    } else {
        println!("  {}{} not found", CROSS, status.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCache;
    use crate::filetype::FileType;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.store.base_dir = Some(dir.path().join("store"));
        config.cache.root_path = "/cache".to_string();
        config
    }

    #[tokio::test]
    async fn missing_store_is_reported() {
        let dir = TempDir::new().unwrap();
        let status = collect(&config_for(&dir)).await.unwrap();
        assert!(!status.store_available);
        assert!(!status.root_present);
    }

    #[tokio::test]
    async fn counts_entries_below_root() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        std::fs::create_dir_all(dir.path().join("store/cache")).unwrap();

        let factory = FsResolverFactory::new(dir.path().join("store"));
        let resolver = factory.open("svc").await.unwrap();
        let cache = FileCache::new(config.cache.root().unwrap(), "Status Cache");
        cache
            .write_file(Some(&*resolver), "a/b.css", "abc", FileType::Css)
            .await
            .unwrap();
        cache
            .write_file(Some(&*resolver), "c.txt", "de", FileType::Text)
            .await
            .unwrap();

        let status = collect(&config).await.unwrap();
        assert!(status.root_present);
        assert_eq!(status.entries, 2);
        assert_eq!(status.folders, 1);
        assert_eq!(status.total_bytes, 5);
    }
}
