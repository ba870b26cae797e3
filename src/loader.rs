//! Source loading from files and memory.
//!
//! Handles reading schema sources and include documents, loading type
//! descriptors, and normalizing include paths.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::declaration::{Document, JsonFrontEnd};
use crate::error::SchemaError;
use crate::resolver;
use crate::type_info::{TypeDescriptor, TypeInfo};
use crate::types::ResolveOptions;

/// Where source and include text comes from.
pub trait SourceProvider {
    /// Read the text at `path`.
    ///
    /// # Errors
    ///
    /// `FileNotFound` if nothing exists at `path`, `ReadError` if it cannot be read.
    fn read(&self, path: &Path) -> Result<String, SchemaError>;
}

/// Reads sources from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl SourceProvider for FileSystem {
    fn read(&self, path: &Path) -> Result<String, SchemaError> {
        read_source(path)
    }
}

/// In-memory sources keyed by lexically normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: BTreeMap<PathBuf, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source, replacing any previous text at the same path.
    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files
            .insert(lexical_normalize(path.as_ref()), text.into());
    }
}

impl SourceProvider for MemorySources {
    fn read(&self, path: &Path) -> Result<String, SchemaError> {
        self.files
            .get(&lexical_normalize(path))
            .cloned()
            .ok_or_else(|| SchemaError::FileNotFound {
                path: path.to_path_buf(),
            })
    }
}

/// Read a source file.
///
/// # Errors
///
/// Returns `SchemaError::FileNotFound` if the file doesn't exist,
/// or `SchemaError::ReadError` if it can't be read.
pub fn read_source(path: &Path) -> Result<String, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a JSON declaration document and its includes from disk.
///
/// # Errors
///
/// Returns IO errors for the document or any include, and any error raised
/// while building or resolving declarations.
pub fn load_document(path: &Path, options: &ResolveOptions) -> Result<Document, SchemaError> {
    resolver::resolve(path, &JsonFrontEnd, &FileSystem, options)
}

/// Parse a type descriptor from JSON text.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` if the text isn't a valid descriptor.
pub fn load_descriptor_str(content: &str) -> Result<TypeDescriptor, SchemaError> {
    serde_json::from_str(content).map_err(|source| SchemaError::InvalidJson { source })
}

/// Load a type descriptor file.
pub fn load_descriptor(path: &Path) -> Result<TypeDescriptor, SchemaError> {
    load_descriptor_str(&read_source(path)?)
}

/// Load a type descriptor file and build its TypeInfo.
pub fn load_type_info(path: &Path) -> Result<TypeInfo, SchemaError> {
    load_descriptor(path)?.into_type_info()
}

/// Path of an include, relative to the directory of the including document.
pub fn include_path(including: &Path, include: &str) -> PathBuf {
    let include = Path::new(include);
    if include.is_absolute() {
        return lexical_normalize(include);
    }
    let dir = including.parent().unwrap_or(Path::new(""));
    lexical_normalize(&dir.join(include))
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    result.components().next_back(),
                    Some(Component::Normal(_))
                ) && result.pop();
                if !popped && !result.has_root() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

/// Canonical path when it exists, otherwise absolute and lexically normalized.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    lexical_normalize(&absolute)
}
