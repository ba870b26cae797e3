//! Core types shared across declaration resolution and type validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Where a declaration, tag or error originated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source name (usually a file path).
    pub source: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            source: source.into(),
            line,
            column,
        }
    }

    /// Location used for errors raised through the programmatic API.
    pub fn api() -> Self {
        Self::new("<api>", 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}:{}:{}", self.source, self.line, self.column)
        }
    }
}

/// A runtime value checked by the TypeInfo API.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value; accepted wherever the arity minimum is zero.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Duration(TimeDelta),
    Guid(Uuid),
    Uri(Url),
    Path(PathBuf),
    List(Vec<Value>),
    /// Instance of a class: named attributes.
    Object(BTreeMap<String, Value>),
    /// Dictionary: string keys to values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Returns the host type name of a value for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Date(_) => "date",
        Value::Time(_) => "time",
        Value::DateTime(_) => "datetime",
        Value::Duration(_) => "duration",
        Value::Guid(_) => "guid",
        Value::Uri(_) => "uri",
        Value::Path(_) => "path",
        Value::List(_) => "list",
        Value::Object(_) => "object",
        Value::Map(_) => "map",
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Constructs that a schema source may use.
///
/// A construct that is switched off fails with `SchemaError::UnsupportedConstruct`
/// at the callback that introduces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Object declarations (user-defined compound types).
    pub custom_types: bool,
    /// Attribute-kind declarations.
    pub attributes: bool,
    /// Definition-kind declarations.
    pub definitions: bool,
    /// Extension names that may be invoked. `None` allows any extension.
    pub extensions: Option<BTreeSet<String>>,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            custom_types: true,
            attributes: true,
            definitions: true,
            extensions: None,
        }
    }
}

impl FeatureFlags {
    pub fn allows_extension(&self, name: &str) -> bool {
        self.extensions
            .as_ref()
            .map_or(true, |allowed| allowed.contains(name))
    }
}

/// Options for building and resolving a document.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// When true, an unresolvable reference fails instead of leaving a placeholder.
    pub strict: bool,
    pub flags: FeatureFlags,
}

impl ResolveOptions {
    /// Create new resolve options with strict mode disabled and every construct enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict reference resolution.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replace the feature flags.
    pub fn flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Restrict extensions to the given names.
    pub fn allow_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extensions = Some(names.into_iter().map(Into::into).collect());
        self
    }
}
