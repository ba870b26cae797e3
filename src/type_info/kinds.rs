//! Kind-specific payloads carried by [`TypeInfo`](super::TypeInfo).

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TypeInfo;
use crate::error::SchemaError;

/// Name of a fundamental kind as written in schema sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalKind {
    Bool,
    Int,
    Float,
    String,
    Enum,
    Date,
    Time,
    DateTime,
    Duration,
    Guid,
    Uri,
    Filename,
    Directory,
}

impl FundamentalKind {
    pub const ALL: [FundamentalKind; 13] = [
        FundamentalKind::Bool,
        FundamentalKind::Int,
        FundamentalKind::Float,
        FundamentalKind::String,
        FundamentalKind::Enum,
        FundamentalKind::Date,
        FundamentalKind::Time,
        FundamentalKind::DateTime,
        FundamentalKind::Duration,
        FundamentalKind::Guid,
        FundamentalKind::Uri,
        FundamentalKind::Filename,
        FundamentalKind::Directory,
    ];

    /// The keyword used for this kind in schema sources.
    pub fn name(&self) -> &'static str {
        match self {
            FundamentalKind::Bool => "bool",
            FundamentalKind::Int => "int",
            FundamentalKind::Float => "number",
            FundamentalKind::String => "string",
            FundamentalKind::Enum => "enum",
            FundamentalKind::Date => "date",
            FundamentalKind::Time => "time",
            FundamentalKind::DateTime => "datetime",
            FundamentalKind::Duration => "duration",
            FundamentalKind::Guid => "guid",
            FundamentalKind::Uri => "uri",
            FundamentalKind::Filename => "filename",
            FundamentalKind::Directory => "directory",
        }
    }

    /// Parse a fundamental kind keyword. Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for FundamentalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled regular expression that must match the whole text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    /// Compile `source`; invalid expressions are a metadata error.
    pub fn new(source: &str) -> Result<Self, SchemaError> {
        let anchored = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            SchemaError::metadata(
                &["validation_expression"],
                format!("invalid regular expression: {}", e),
            )
        })?;
        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntKind {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Storage width in bytes (1, 2, 4 or 8).
    pub bytes: Option<u8>,
}

impl IntKind {
    pub fn range(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            bytes: None,
        }
    }

    /// Non-negative values only.
    pub fn is_unsigned(&self) -> bool {
        matches!(self.min, Some(min) if min >= 0)
    }

    /// Bounds implied by the byte width, if one is declared.
    pub fn width_bounds(&self) -> Option<(i64, i64)> {
        let bytes = self.bytes.filter(|b| matches!(b, 1 | 2 | 4 | 8))?;
        let bits = u32::from(bytes) * 8;
        if self.is_unsigned() {
            let max = if bits >= 64 {
                i64::MAX
            } else {
                ((1u64 << bits) - 1) as i64
            };
            Some((0, max))
        } else {
            let half = 1i128 << (bits - 1);
            Some(((-half) as i64, (half - 1) as i64))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatKind {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringKind {
    pub validation_expression: Option<Pattern>,
    /// Minimum length in characters; empty strings are rejected unless this is 0.
    pub min_length: usize,
    pub max_length: Option<usize>,
}

impl Default for StringKind {
    fn default() -> Self {
        Self {
            validation_expression: None,
            min_length: 1,
            max_length: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumKind {
    pub values: Vec<String>,
    /// Display names, one per value.
    pub friendly_values: Option<Vec<String>>,
}

impl EnumKind {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            friendly_values: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilenameKind {
    pub ensure_exists: bool,
    /// Accept directories as well as files.
    pub match_any: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryKind {
    pub ensure_exists: bool,
}

/// A named member of a class or dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub type_info: TypeInfo,
}

impl Member {
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
        }
    }
}

/// Members of a class (over `Value::Object`) or dictionary (over `Value::Map`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassKind {
    pub members: Vec<Member>,
    /// Reject values carrying names that are not members.
    pub require_exact_match: bool,
}

impl ClassKind {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            require_exact_match: false,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Ordered alternatives; the first one that accepts a value wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnyOfKind {
    pub alternatives: Vec<TypeInfo>,
}
