//! CLI command implementations

pub mod cache;
pub mod config;
pub mod init;
pub mod status;

pub use cache::{exists, purge, read, write};
pub use config::execute as config;
pub use init::execute as init;
pub use status::execute as status;

use crate::cache::FileCache;
use crate::config::{Config, ConfigManager};
use crate::error::TreeCacheResult;
use crate::store::{FsResolverFactory, ResolverFactory, ResourceResolver};

/// A resolver over the configured filesystem store, with the cache it serves
///
/// Commands run outside `CacheService` so that a one-shot invocation does
/// not purge the cache on the way in and out.
pub(crate) struct StoreSession {
    pub factory: FsResolverFactory,
    pub resolver: Box<dyn ResourceResolver>,
    pub cache: FileCache,
}

impl StoreSession {
    pub async fn open(config: &Config) -> TreeCacheResult<Self> {
        let factory = FsResolverFactory::new(ConfigManager::store_dir(config));
        let resolver = factory.open(&config.cache.service_user).await?;
        let cache = FileCache::new(config.cache.root()?, config.cache.display_name.clone());
        Ok(Self {
            factory,
            resolver,
            cache,
        })
    }

    pub fn resolver(&self) -> Option<&dyn ResourceResolver> {
        Some(&*self.resolver)
    }

    pub fn close(self) {
        self.factory.close(self.resolver);
    }
}
