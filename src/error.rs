//! Error types for declaration resolution, type validation and serialization.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SourceLocation;

/// Errors raised while building, resolving or using schema definitions.
#[derive(Debug, Error)]
pub enum SchemaError {
    // Malformed input (exit code 2)
    #[error("{location}: invalid arity \"{text}\": {reason}")]
    InvalidArity {
        text: String,
        reason: String,
        location: SourceLocation,
    },

    #[error("{location}: metadata \"{tag}\" was already provided (first at {first})")]
    DuplicateMetadata {
        tag: String,
        first: SourceLocation,
        location: SourceLocation,
    },

    #[error("{location}: invalid metadata [{}]: {message}", tags.join(", "))]
    MetadataConstraint {
        tags: Vec<String>,
        message: String,
        location: SourceLocation,
    },

    #[error("{location}: unable to resolve reference \"{reference}\"")]
    UnresolvedReference {
        reference: String,
        location: SourceLocation,
    },

    #[error("{location}: circular reference through \"{key}\"")]
    CircularReference {
        key: String,
        location: SourceLocation,
    },

    #[error("{location}: {construct} is not supported here")]
    UnsupportedConstruct {
        construct: String,
        location: SourceLocation,
    },

    #[error("{location}: \"{key}\" is already defined (first at {first})")]
    DuplicateKey {
        key: String,
        first: SourceLocation,
        location: SourceLocation,
    },

    #[error("{location}: declaration \"{key}\" is committed and can no longer change {field}")]
    ImmutableViolation {
        key: String,
        field: &'static str,
        location: SourceLocation,
    },

    #[error("{location}: \"{text}\" is not a valid {kind}: {reason}")]
    StringFormat {
        kind: String,
        text: String,
        reason: String,
        location: SourceLocation,
    },

    // Rejected values (exit code 1)
    #[error("invalid value: {0}")]
    InvalidValue(#[from] ValidationError),

    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaError::FileNotFound { .. } | SchemaError::ReadError { .. } => 3,
            SchemaError::InvalidValue(_) => 1,
            _ => 2,
        }
    }

    /// Source location the error is attributed to, when it has one.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            SchemaError::InvalidArity { location, .. }
            | SchemaError::DuplicateMetadata { location, .. }
            | SchemaError::MetadataConstraint { location, .. }
            | SchemaError::UnresolvedReference { location, .. }
            | SchemaError::CircularReference { location, .. }
            | SchemaError::UnsupportedConstruct { location, .. }
            | SchemaError::DuplicateKey { location, .. }
            | SchemaError::ImmutableViolation { location, .. }
            | SchemaError::StringFormat { location, .. } => Some(location),
            SchemaError::InvalidValue(_)
            | SchemaError::FileNotFound { .. }
            | SchemaError::ReadError { .. }
            | SchemaError::InvalidJson { .. } => None,
        }
    }

    /// Re-attribute an API-originated error to a source location.
    ///
    /// Errors that already carry a real location keep it.
    pub fn at(mut self, new_location: &SourceLocation) -> Self {
        match &mut self {
            SchemaError::InvalidArity { location, .. }
            | SchemaError::DuplicateMetadata { location, .. }
            | SchemaError::MetadataConstraint { location, .. }
            | SchemaError::UnresolvedReference { location, .. }
            | SchemaError::CircularReference { location, .. }
            | SchemaError::UnsupportedConstruct { location, .. }
            | SchemaError::DuplicateKey { location, .. }
            | SchemaError::ImmutableViolation { location, .. }
            | SchemaError::StringFormat { location, .. } => {
                if *location == SourceLocation::api() {
                    *location = new_location.clone();
                }
            }
            _ => {}
        }
        self
    }

    pub(crate) fn metadata(tags: &[&str], message: impl Into<String>) -> Self {
        SchemaError::MetadataConstraint {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            message: message.into(),
            location: SourceLocation::api(),
        }
    }

    pub(crate) fn unsupported(construct: impl Into<String>, location: &SourceLocation) -> Self {
        SchemaError::UnsupportedConstruct {
            construct: construct.into(),
            location: location.clone(),
        }
    }

    pub(crate) fn string_format(
        kind: impl Into<String>,
        text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::StringFormat {
            kind: kind.into(),
            text: text.into(),
            reason: reason.into(),
            location: SourceLocation::api(),
        }
    }
}

/// A value rejected by `TypeInfo::validate`, with the path to the offending item.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("{}", display_validation(.path, .message))]
pub struct ValidationError {
    /// Path to the invalid item (e.g. "/members/name/2"); empty for the root value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

fn display_validation(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", path, message)
    }
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }

    /// Prefix the path with a parent segment.
    pub fn within(mut self, segment: &str) -> Self {
        self.path = format!("/{}{}", segment, self.path);
        self
    }
}

/// Single JSON Schema validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PayloadError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors during JSON payload validation against emitted JSON Schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("emitted JSON Schema was rejected: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<PayloadError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Schema(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}
