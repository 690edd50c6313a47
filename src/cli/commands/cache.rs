//! Cache commands - write, read, check and purge entries

use crate::cache::FileCache;
use crate::cli::args::{ExistsArgs, ReadArgs, WriteArgs};
use crate::cli::commands::StoreSession;
use crate::config::Config;
use crate::error::{TreeCacheError, TreeCacheResult};
use crate::filetype::{
    CssFile, FileType, HtmlFile, JavaScriptFile, JsonFile, TextFile, TypedFile,
};
use crate::store::ResourceResolver;
use console::style;
use tracing::debug;

/// Execute the write command
pub async fn write(args: WriteArgs, config: &Config) -> TreeCacheResult<()> {
    let content = match (args.content, args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TreeCacheError::io(format!("reading {}", path.display()), e))?,
        (None, None) => {
            return Err(TreeCacheError::User(
                "either --content or --file is required".to_string(),
            ))
        }
    };

    let session = StoreSession::open(config).await?;
    let result = session
        .cache
        .write_file(session.resolver(), &args.path, &content, args.file_type)
        .await;
    session.close();
    result?;

    println!(
        "{} Cached {} ({}, {} bytes)",
        style("✓").green(),
        args.path,
        args.file_type.output_content_type(),
        content.len()
    );
    Ok(())
}

/// Execute the read command
pub async fn read(args: ReadArgs, config: &Config) -> TreeCacheResult<()> {
    let session = StoreSession::open(config).await?;
    let result = read_content(&session.cache, session.resolver(), &args.path, args.file_type).await;
    session.close();

    print!("{}", result?);
    Ok(())
}

/// Execute the exists command, returning whether the entry is cached
pub async fn exists(args: ExistsArgs, config: &Config) -> TreeCacheResult<bool> {
    let session = StoreSession::open(config).await?;
    let cached = session.cache.is_cached(session.resolver(), &args.path).await;
    session.close();

    if cached {
        println!("{} {} cached", style("✓").green(), args.path);
    } else {
        println!("{} {} not cached", style("✗").red(), args.path);
    }
    Ok(cached)
}

/// Execute the purge command
pub async fn purge(config: &Config) -> TreeCacheResult<()> {
    let session = StoreSession::open(config).await?;
    let result = session.cache.purge_all(session.resolver()).await;
    session.close();
    let report = result?;

    println!(
        "{} Purged {}: {} removed",
        style("✓").green(),
        config.cache.root_path,
        report.removed_count()
    );
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            style("✗").red(),
            failure.path,
            style(&failure.reason).dim()
        );
    }
    Ok(())
}

/// Read an entry as the view matching `file_type` and return its body
async fn read_content(
    cache: &FileCache,
    resolver: Option<&dyn ResourceResolver>,
    path: &str,
    file_type: FileType,
) -> TreeCacheResult<String> {
    debug!("Reading {} as {}", path, file_type);
    match file_type {
        FileType::Text => read_as::<TextFile>(cache, resolver, path, |f| f.into_content()).await,
        FileType::Css => read_as::<CssFile>(cache, resolver, path, |f| f.into_content()).await,
        FileType::JavaScript => {
            read_as::<JavaScriptFile>(cache, resolver, path, |f| f.into_content()).await
        }
        FileType::Html => read_as::<HtmlFile>(cache, resolver, path, |f| f.into_content()).await,
        FileType::Json => {
            read_as::<JsonFile>(cache, resolver, path, |f| {
                serde_json::to_string_pretty(f.value()).unwrap_or_else(|_| f.content().to_string())
            })
            .await
        }
    }
}

async fn read_as<T: TypedFile>(
    cache: &FileCache,
    resolver: Option<&dyn ResourceResolver>,
    path: &str,
    body: impl FnOnce(T) -> String,
) -> TreeCacheResult<String> {
    let file: T = cache.read_file(resolver, path).await?;
    Ok(body(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsResolverFactory, ResolverFactory, ResourcePath};
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_content_by_type() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        let factory = FsResolverFactory::new(dir.path());
        let resolver = factory.open("cli").await.unwrap();
        let cache = FileCache::new(ResourcePath::parse("/cache").unwrap(), "CLI Cache");

        cache
            .write_file(Some(&*resolver), "doc.json", "{\"a\":1}", FileType::Json)
            .await
            .unwrap();

        let pretty = read_content(&cache, Some(&*resolver), "doc.json", FileType::Json)
            .await
            .unwrap();
        assert!(pretty.contains("\"a\": 1"));

        let err = read_content(&cache, Some(&*resolver), "doc.json", FileType::Css)
            .await
            .unwrap_err();
        assert!(matches!(err, TreeCacheError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn exists_reports_miss_without_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        let mut config = Config::default();
        config.cache.root_path = "/cache".to_string();
        config.store.base_dir = Some(dir.path().to_path_buf());

        let miss = exists(
            ExistsArgs {
                path: "missing.css".to_string(),
            },
            &config,
        )
        .await
        .unwrap();
        assert!(!miss);

        let factory = FsResolverFactory::new(dir.path());
        let resolver = factory.open("cli").await.unwrap();
        FileCache::new(ResourcePath::parse("/cache").unwrap(), "CLI Cache")
            .write_file(Some(&*resolver), "site.css", "a {}", FileType::Css)
            .await
            .unwrap();

        let hit = exists(
            ExistsArgs {
                path: "site.css".to_string(),
            },
            &config,
        )
        .await
        .unwrap();
        assert!(hit);
    }
}
