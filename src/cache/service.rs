//! Cache service lifecycle
//!
//! `CacheService` owns the service resolver: it is opened on `activate`,
//! closed on `deactivate`, and the cache is purged at both transitions.
//! Purge failures during a transition are logged, never returned.

use crate::audit::{AuditEvent, AuditLog};
use crate::cache::file_cache::FileCache;
use crate::cache::purge::{PurgeHistory, PurgeReport};
use crate::config::Config;
use crate::error::TreeCacheResult;
use crate::filetype::{FileType, TypedFile};
use crate::store::{ResolverFactory, ResourceResolver};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Snapshot of a service for status output
#[derive(Debug, Clone, Serialize)]
pub struct CacheServiceInfo {
    pub display_name: String,
    pub root: String,
    pub backend: String,
    pub service_user: String,
    pub resolver_live: bool,
    pub purge_count: usize,
    pub last_purge: Option<PurgeReport>,
}

/// File cache bound to a service resolver
pub struct CacheService {
    cache: FileCache,
    factory: Arc<dyn ResolverFactory>,
    service_user: String,
    resolver: Option<Box<dyn ResourceResolver>>,
    history: Mutex<PurgeHistory>,
    audit: AuditLog,
}

impl CacheService {
    pub fn new(
        cache: FileCache,
        factory: Arc<dyn ResolverFactory>,
        service_user: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            factory,
            service_user: service_user.into(),
            resolver: None,
            history: Mutex::new(PurgeHistory::new(10)),
            audit: AuditLog::disabled(),
        }
    }

    /// Build a service from the `[cache]` section of a config
    pub fn from_config(config: &Config, factory: Arc<dyn ResolverFactory>) -> TreeCacheResult<Self> {
        let cache = FileCache::new(config.cache.root()?, config.cache.display_name.clone());
        Ok(Self::new(cache, factory, config.cache.service_user.clone())
            .with_history_limit(config.cache.purge_history_limit)
            .with_audit(AuditLog::new(config)))
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = Mutex::new(PurgeHistory::new(limit));
        self
    }

    /// Open the service resolver and clear stale entries
    ///
    /// A resolver that cannot be opened leaves the service active without
    /// one; every cache call then reports a closed resolver.
    pub async fn activate(&mut self) {
        if let Some(previous) = self.resolver.take() {
            warn!("{} activated twice, closing previous resolver", self.display_name());
            self.factory.close(previous);
        }

        self.resolver = match self.factory.open(&self.service_user).await {
            Ok(resolver) => Some(resolver),
            Err(e) => {
                error!(
                    "{} could not open service resource resolver: {}",
                    self.display_name(),
                    e
                );
                None
            }
        };

        if let Err(e) = self.purge_all().await {
            error!("{}", e);
        }

        info!("{} activated", self.display_name());
        self.audit
            .record(
                self.display_name(),
                AuditEvent::Activated {
                    root: self.cache.root().to_string(),
                    resolver_live: self.is_live(),
                },
            )
            .await;
    }

    /// Clear the cache and close the service resolver
    pub async fn deactivate(&mut self) {
        if let Err(e) = self.purge_all().await {
            error!("{}", e);
        }

        if let Some(resolver) = self.resolver.take() {
            self.factory.close(resolver);
        }

        info!("{} deactivated", self.display_name());
        self.audit
            .record(self.display_name(), AuditEvent::Deactivated)
            .await;
    }

    /// The service resolver, if one is open
    pub fn resolver(&self) -> Option<&dyn ResourceResolver> {
        self.resolver.as_deref()
    }

    /// Whether a live resolver is held
    pub fn is_live(&self) -> bool {
        self.resolver().is_some_and(|r| r.is_live())
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    pub fn display_name(&self) -> &str {
        self.cache.display_name()
    }

    pub async fn write_file(
        &self,
        relative_path: &str,
        content: &str,
        file_type: FileType,
    ) -> TreeCacheResult<()> {
        let result = self
            .cache
            .write_file(self.resolver(), relative_path, content, file_type)
            .await;
        if let Err(e) = &result {
            self.audit
                .record(
                    self.display_name(),
                    AuditEvent::WriteFailed {
                        path: relative_path.to_string(),
                        reason: e.to_string(),
                    },
                )
                .await;
        }
        result
    }

    pub async fn read_file<T: TypedFile>(&self, relative_path: &str) -> TreeCacheResult<T> {
        self.cache.read_file(self.resolver(), relative_path).await
    }

    pub async fn is_cached(&self, relative_path: &str) -> bool {
        self.cache.is_cached(self.resolver(), relative_path).await
    }

    /// Purge the cache and record the outcome in the history
    pub async fn purge_all(&self) -> TreeCacheResult<PurgeReport> {
        let report = self.cache.purge_all(self.resolver()).await?;
        self.history.lock().push(report.clone());
        self.audit
            .record(self.display_name(), AuditEvent::purged(&report))
            .await;
        Ok(report)
    }

    pub fn last_purge(&self) -> Option<PurgeReport> {
        self.history.lock().last().cloned()
    }

    /// Recorded purges, oldest first
    pub fn purge_history(&self) -> Vec<PurgeReport> {
        self.history.lock().records()
    }

    pub fn info(&self) -> CacheServiceInfo {
        let history = self.history.lock();
        CacheServiceInfo {
            display_name: self.display_name().to_string(),
            root: self.cache.root().to_string(),
            backend: self.factory.backend_name().to_string(),
            service_user: self.service_user.clone(),
            resolver_live: self.is_live(),
            purge_count: history.len(),
            last_purge: history.last().cloned(),
        }
    }
}
