//! Cardinality contracts for declarations and type information.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;
use crate::types::SourceLocation;

/// Cardinality of a value: `min` required items, at most `max` (`None` = unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    min: u32,
    max: Option<u32>,
}

impl Default for Arity {
    fn default() -> Self {
        Self::single()
    }
}

impl Arity {
    /// Create an arity, rejecting `min > max` and a maximum of zero.
    pub fn new(min: u32, max: Option<u32>) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidArity {
            text: match max {
                Some(max) => format!("{{{},{}}}", min, max),
                None => format!("{{{},}}", min),
            },
            reason: reason.to_string(),
            location: SourceLocation::api(),
        };
        match max {
            Some(0) => Err(invalid("maximum must be at least 1")),
            Some(max) if min > max => Err(invalid("minimum is greater than maximum")),
            _ => Ok(Self { min, max }),
        }
    }

    /// Exactly one item.
    pub const fn single() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }

    /// `?`
    pub const fn optional() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// `*`
    pub const fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// `+`
    pub const fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Parse arity shorthand: `?`, `*`, `+`, `{n}`, `{n,m}` or `{n,}`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidArity` for malformed text or `n > m`.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Self::parse_at(text, &SourceLocation::api())
    }

    /// Like [`Arity::parse`], attributing failures to `location`.
    pub fn parse_at(text: &str, location: &SourceLocation) -> Result<Self, SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidArity {
            text: text.to_string(),
            reason: reason.to_string(),
            location: location.clone(),
        };

        match text.trim() {
            "?" => Ok(Self::optional()),
            "*" => Ok(Self::zero_or_more()),
            "+" => Ok(Self::one_or_more()),
            other => {
                let inner = other
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .ok_or_else(|| invalid("expected '?', '*', '+' or '{n,m}'"))?;

                let parse_bound = |s: &str| -> Result<u32, SchemaError> {
                    s.trim()
                        .parse::<u32>()
                        .map_err(|_| invalid("bounds must be non-negative integers"))
                };

                let (min, max) = match inner.split_once(',') {
                    None => {
                        let n = parse_bound(inner)?;
                        (n, Some(n))
                    }
                    Some((lo, hi)) if hi.trim().is_empty() => (parse_bound(lo)?, None),
                    Some((lo, hi)) => (parse_bound(lo)?, Some(parse_bound(hi)?)),
                };

                Self::new(min, max).map_err(|e| match e {
                    SchemaError::InvalidArity { reason, .. } => invalid(&reason),
                    other => other,
                })
            }
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn is_single(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0 && self.max == Some(1)
    }

    /// More than one item may be present.
    pub fn is_collection(&self) -> bool {
        match self.max {
            None => true,
            Some(max) => max > 1,
        }
    }

    /// `{n}` with `n != 1`.
    pub fn is_fixed_collection(&self) -> bool {
        self.max == Some(self.min) && self.min != 1
    }

    pub fn is_zero_or_more(&self) -> bool {
        self.min == 0 && self.max.is_none()
    }

    pub fn is_one_or_more(&self) -> bool {
        self.min == 1 && self.max.is_none()
    }

    /// A bounded collection whose minimum and maximum differ, e.g. `{2,4}`.
    pub fn is_range(&self) -> bool {
        matches!(self.max, Some(max) if max > 1 && max != self.min)
    }

    /// Check an item count against this arity.
    pub fn accepts_count(&self, count: usize) -> bool {
        let count = count as u64;
        count >= u64::from(self.min) && self.max.map_or(true, |max| count <= u64::from(max))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (min, None) => write!(f, "{{{},}}", min),
            (min, Some(max)) if min == max => write!(f, "{{{}}}", min),
            (min, Some(max)) => write!(f, "{{{},{}}}", min, max),
        }
    }
}

impl FromStr for Arity {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Arity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Arity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
