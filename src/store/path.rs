//! Resource path types
//!
//! `ResourcePath` is an absolute path in the resource tree; `CachePath`
//! addresses an entry relative to a cache root. Both are ordered segment
//! lists, so parent/leaf derivation never depends on string splitting.

use crate::error::{TreeCacheError, TreeCacheResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Split a raw path into validated segments.
///
/// Empty segments (leading, trailing or doubled slashes) are dropped.
fn parse_segments(raw: &str) -> TreeCacheResult<Vec<String>> {
    let mut segments = Vec::new();
    for segment in raw.split('/') {
        if segment.is_empty() {
            continue;
        }
        validate_name(segment).map_err(|reason| TreeCacheError::path_invalid(raw, reason))?;
        segments.push(segment.to_string());
    }
    Ok(segments)
}

/// Check a single node name.
///
/// `.` and `..` are rejected rather than resolved, so a node path never
/// leaves the tree it was built under.
pub(crate) fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty node name".to_string());
    }
    if name == "." || name == ".." {
        return Err(format!("relative segment '{}' is not allowed", name));
    }
    if name.trim() != name {
        return Err(format!("node name '{}' has surrounding whitespace", name));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("node name '{}' contains a path separator", name));
    }
    if name.starts_with(".resource") || name == ".content" {
        return Err(format!("node name '{}' is reserved", name));
    }
    Ok(())
}

/// Absolute path of a node in the resource tree
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// The tree root (`/`)
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an absolute path such as `/var/cache/styles`
    pub fn parse(raw: &str) -> TreeCacheResult<Self> {
        if !raw.starts_with('/') {
            return Err(TreeCacheError::path_invalid(raw, "path must be absolute"));
        }
        Ok(Self {
            segments: parse_segments(raw)?,
        })
    }

    /// Whether this is the tree root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments from the root down
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Path of a direct child
    pub fn child(&self, name: &str) -> TreeCacheResult<Self> {
        validate_name(name).map_err(|reason| TreeCacheError::path_invalid(name, reason))?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    /// Append a relative cache path
    pub fn join(&self, relative: &CachePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// Whether `self` is `ancestor` or lies beneath it
    pub fn starts_with(&self, ancestor: &ResourcePath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Segments below `ancestor`, `None` when `self` is not under it
    pub fn strip_prefix(&self, ancestor: &ResourcePath) -> Option<&[String]> {
        self.segments.strip_prefix(ancestor.segments.as_slice())
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = TreeCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = TreeCacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}

/// Path of a cache entry relative to the cache root
///
/// Accepts `a/b/c.css` and `/a/b/c.css` alike. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CachePath {
    segments: Vec<String>,
}

impl CachePath {
    /// Parse a relative entry path
    pub fn parse(raw: &str) -> TreeCacheResult<Self> {
        let segments = parse_segments(raw)?;
        if segments.is_empty() {
            return Err(TreeCacheError::path_invalid(raw, "cache path is empty"));
        }
        Ok(Self { segments })
    }

    /// File name of the entry
    pub fn name(&self) -> &str {
        // parse() guarantees at least one segment
        &self.segments[self.segments.len() - 1]
    }

    /// All segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for CachePath {
    type Err = TreeCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
