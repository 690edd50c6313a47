//! Hierarchical file cache over a resource tree
//!
//! `FileCache` maps cache-relative paths onto nodes beneath a cache root
//! and borrows a resolver per call. `CacheService` owns that resolver for
//! the lifetime of the service.
//!
//! # Lifecycle
//!
//! | Transition | Effect |
//! |------------|--------|
//! | activate | open resolver, purge |
//! | deactivate | purge, close resolver |

pub mod file_cache;
pub mod purge;
pub mod service;

pub use file_cache::FileCache;
pub use purge::{PurgeFailure, PurgeHistory, PurgeReport};
pub use service::{CacheService, CacheServiceInfo};
