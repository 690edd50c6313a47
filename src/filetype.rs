//! File types and typed views of cached files
//!
//! A `FileType` decides which content type a cached entry is written with
//! and which content types it accepts when read back. A `TypedFile` is the
//! view a caller asks `read_file` for; adaptation fails when the cached
//! node is a folder, carries a foreign content type or does not parse.

use crate::error::{TreeCacheError, TreeCacheResult};
use crate::store::{Resource, ResourcePath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of file the cache knows how to write and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Css,
    JavaScript,
    Json,
    Html,
}

impl FileType {
    /// Content type written to new cache entries
    pub fn output_content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Css => "text/css",
            Self::JavaScript => "application/javascript",
            Self::Json => "application/json",
            Self::Html => "text/html",
        }
    }

    /// Content types that may be read as this file type
    pub fn readable_content_types(&self) -> &'static [&'static str] {
        match self {
            Self::Text => &["text/*"],
            Self::Css => &["text/css"],
            Self::JavaScript => &["application/javascript", "text/javascript"],
            Self::Json => &["application/json"],
            Self::Html => &["text/html"],
        }
    }

    /// Whether a stored content type is readable as this type
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.readable_content_types()
            .iter()
            .any(|pattern| match pattern.strip_suffix("/*") {
                Some(major) => essence
                    .split_once('/')
                    .is_some_and(|(m, _)| m == major),
                None => essence == *pattern,
            })
    }

    /// All file types
    pub fn all() -> &'static [Self] {
        &[Self::Text, Self::Css, Self::JavaScript, Self::Json, Self::Html]
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Css => "css",
            Self::JavaScript => "javascript",
            Self::Json => "json",
            Self::Html => "html",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "css" => Ok(Self::Css),
            "js" | "javascript" => Ok(Self::JavaScript),
            "json" => Ok(Self::Json),
            "html" | "htm" => Ok(Self::Html),
            other => Err(format!(
                "unknown file type '{}' (expected text, css, js, json or html)",
                other
            )),
        }
    }
}

/// A cached file node, before adaptation to a typed view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub path: ResourcePath,
    pub content_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CachedFile {
    /// Size of the content in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A typed view of a cached file
pub trait TypedFile: Sized {
    /// File type this view reads
    const FILE_TYPE: FileType;

    /// Build the view from a file whose content type already matched
    fn adapt(file: CachedFile) -> Result<Self, String>;
}

/// Adapt a resolved node to the typed view `T`
pub fn adapt_to_file_type<T: TypedFile>(resource: Resource) -> TreeCacheResult<T> {
    let expected = T::FILE_TYPE;
    let mismatch = |path: &ResourcePath, reason: String| TreeCacheError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        reason,
    };

    if !resource.is_file() {
        return Err(mismatch(&resource.path, "resource is a folder".to_string()));
    }
    let content_type = resource.content_type.unwrap_or_default();
    if !expected.accepts(&content_type) {
        return Err(mismatch(
            &resource.path,
            format!("content type '{}' is not readable", content_type),
        ));
    }

    let path = resource.path;
    let file = CachedFile {
        path: path.clone(),
        content_type,
        content: resource.data.unwrap_or_default(),
        created_at: resource.created_at,
    };
    T::adapt(file).map_err(|reason| mismatch(&path, reason))
}

macro_rules! plain_file_view {
    ($(#[$doc:meta])* $name:ident, $file_type:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            file: CachedFile,
        }

        impl $name {
            pub fn path(&self) -> &ResourcePath {
                &self.file.path
            }

            pub fn content(&self) -> &str {
                &self.file.content
            }

            pub fn content_type(&self) -> &str {
                &self.file.content_type
            }

            pub fn size(&self) -> usize {
                self.file.size()
            }

            pub fn into_content(self) -> String {
                self.file.content
            }
        }

        impl TypedFile for $name {
            const FILE_TYPE: FileType = $file_type;

            fn adapt(file: CachedFile) -> Result<Self, String> {
                Ok(Self { file })
            }
        }
    };
}

plain_file_view!(
    /// Any `text/*` file
    TextFile,
    FileType::Text
);
plain_file_view!(
    /// Stylesheet
    CssFile,
    FileType::Css
);
plain_file_view!(
    /// Script
    JavaScriptFile,
    FileType::JavaScript
);
plain_file_view!(HtmlFile, FileType::Html);

/// JSON document, parsed on adaptation
#[derive(Debug, Clone, PartialEq)]
pub struct JsonFile {
    file: CachedFile,
    value: serde_json::Value,
}

impl JsonFile {
    pub fn path(&self) -> &ResourcePath {
        &self.file.path
    }

    pub fn content(&self) -> &str {
        &self.file.content
    }

    pub fn content_type(&self) -> &str {
        &self.file.content_type
    }

    pub fn size(&self) -> usize {
        self.file.size()
    }

    /// Parsed document
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }
}

impl TypedFile for JsonFile {
    const FILE_TYPE: FileType = FileType::Json;

    fn adapt(file: CachedFile) -> Result<Self, String> {
        let value = serde_json::from_str(&file.content).map_err(|e| format!("invalid JSON: {}", e))?;
        Ok(Self { file, value })
    }
}
