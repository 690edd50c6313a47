//! treecache - Path-addressed file cache over a resource tree
//!
//! Materializes text artifacts under a cache root in a tree store, serves
//! them back by path and purges them as a whole.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod filetype;
pub mod store;

pub use audit::{AuditEvent, AuditLog};
pub use cache::{CacheService, FileCache, PurgeReport};
pub use error::{TreeCacheError, TreeCacheResult};
pub use filetype::{CssFile, FileType, HtmlFile, JavaScriptFile, JsonFile, TextFile, TypedFile};
pub use store::{CachePath, ResolverFactory, ResourcePath, ResourceResolver};
