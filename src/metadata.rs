//! Metadata tags: catalog, attachment rules and cross-field constraints.
//!
//! Tags are attached to declarations in source order. The catalog decides which
//! kinds a tag applies to, its host value type, its default, and whether its
//! presence turns a referencing declaration into a new type (as opposed to an
//! alias). Cross-field invariants are checked by [`ConstraintCheck`], which runs
//! for every `TypeInfo` regardless of whether it came from a declaration.

use std::collections::HashSet;
use std::fmt;

use crate::error::SchemaError;
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, FundamentalKind,
    IntKind, Pattern, StringKind, TypeInfo, TypeKind, TypeVisitor,
};
use crate::types::SourceLocation;

/// A metadata value as written in a schema source.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
}

impl MetadataValue {
    fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::String(_) => "string",
            MetadataValue::Integer(_) => "integer",
            MetadataValue::Number(_) => "number",
            MetadataValue::Bool(_) => "bool",
            MetadataValue::List(_) => "list",
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{:?}", s),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| format!("{:?}", s)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

/// Host value type a tag accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataType {
    String,
    Integer,
    /// Integers are accepted and widened.
    Number,
    Bool,
    List,
}

impl MetadataType {
    fn accepts(&self, value: &MetadataValue) -> bool {
        matches!(
            (self, value),
            (MetadataType::String, MetadataValue::String(_))
                | (MetadataType::Integer, MetadataValue::Integer(_))
                | (MetadataType::Number, MetadataValue::Number(_))
                | (MetadataType::Number, MetadataValue::Integer(_))
                | (MetadataType::Bool, MetadataValue::Bool(_))
                | (MetadataType::List, MetadataValue::List(_))
        )
    }
}

/// Default applied when a tag is absent.
#[derive(Debug, Clone, Copy)]
pub enum MetadataDefault {
    None,
    Static(fn() -> MetadataValue),
    /// Computed from the owning declaration's name.
    Computed(fn(Option<&str>) -> Option<MetadataValue>),
}

/// Which declarations a tag may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataScope {
    Any,
    Fundamental(&'static [FundamentalKind]),
    /// Object (compound or simple) declarations.
    Object,
}

/// Catalog entry for a metadata tag.
#[derive(Debug, Clone, Copy)]
pub struct MetadataSpec {
    pub name: &'static str,
    pub host: MetadataType,
    pub default: MetadataDefault,
    /// Presence makes a referencing declaration a new type instead of an alias.
    pub creates_new_type: bool,
    pub scope: MetadataScope,
}

impl MetadataSpec {
    pub fn default_value(&self, owner: Option<&str>) -> Option<MetadataValue> {
        match self.default {
            MetadataDefault::None => None,
            MetadataDefault::Static(f) => Some(f()),
            MetadataDefault::Computed(f) => f(owner),
        }
    }

    pub fn applies_to_fundamental(&self, kind: FundamentalKind) -> bool {
        match self.scope {
            MetadataScope::Any => true,
            MetadataScope::Fundamental(kinds) => kinds.contains(&kind),
            MetadataScope::Object => false,
        }
    }

    pub fn applies_to_object(&self) -> bool {
        matches!(self.scope, MetadataScope::Any | MetadataScope::Object)
    }
}

fn default_false() -> MetadataValue {
    MetadataValue::Bool(false)
}

fn default_value_name() -> MetadataValue {
    MetadataValue::String("value".to_string())
}

fn plural_of(name: Option<&str>) -> Option<MetadataValue> {
    name.map(|n| MetadataValue::String(format!("{}s", n)))
}

const NUMERIC: &[FundamentalKind] = &[FundamentalKind::Int, FundamentalKind::Float];

/// Every tag the schema language understands.
pub const CATALOG: &[MetadataSpec] = &[
    MetadataSpec {
        name: "description",
        host: MetadataType::String,
        default: MetadataDefault::None,
        creates_new_type: false,
        scope: MetadataScope::Any,
    },
    MetadataSpec {
        name: "plural",
        host: MetadataType::String,
        default: MetadataDefault::Computed(plural_of),
        creates_new_type: false,
        scope: MetadataScope::Any,
    },
    MetadataSpec {
        name: "min",
        host: MetadataType::Number,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(NUMERIC),
    },
    MetadataSpec {
        name: "max",
        host: MetadataType::Number,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(NUMERIC),
    },
    MetadataSpec {
        name: "bytes",
        host: MetadataType::Integer,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::Int]),
    },
    MetadataSpec {
        name: "min_length",
        host: MetadataType::Integer,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::String]),
    },
    MetadataSpec {
        name: "max_length",
        host: MetadataType::Integer,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::String]),
    },
    MetadataSpec {
        name: "validation_expression",
        host: MetadataType::String,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::String]),
    },
    MetadataSpec {
        name: "values",
        host: MetadataType::List,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::Enum]),
    },
    MetadataSpec {
        name: "friendly_values",
        host: MetadataType::List,
        default: MetadataDefault::None,
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::Enum]),
    },
    MetadataSpec {
        name: "ensure_exists",
        host: MetadataType::Bool,
        default: MetadataDefault::Static(default_false),
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::Filename, FundamentalKind::Directory]),
    },
    MetadataSpec {
        name: "match_any",
        host: MetadataType::Bool,
        default: MetadataDefault::Static(default_false),
        creates_new_type: true,
        scope: MetadataScope::Fundamental(&[FundamentalKind::Filename]),
    },
    MetadataSpec {
        name: "require_exact_match",
        host: MetadataType::Bool,
        default: MetadataDefault::Static(default_false),
        creates_new_type: true,
        scope: MetadataScope::Object,
    },
    MetadataSpec {
        name: "fundamental_name",
        host: MetadataType::String,
        default: MetadataDefault::Static(default_value_name),
        creates_new_type: true,
        scope: MetadataScope::Object,
    },
];

/// Look up a tag in the catalog.
pub fn lookup(tag: &str) -> Option<&'static MetadataSpec> {
    CATALOG.iter().find(|spec| spec.name == tag)
}

/// A tag attached to a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataItem {
    pub tag: String,
    pub value: MetadataValue,
    pub location: SourceLocation,
}

/// Tags in attachment order; a tag appears at most once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataMap {
    items: Vec<MetadataItem>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tag.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::DuplicateMetadata` if the tag is already present.
    pub fn insert(&mut self, item: MetadataItem) -> Result<(), SchemaError> {
        if let Some(existing) = self.get(&item.tag) {
            return Err(SchemaError::DuplicateMetadata {
                tag: item.tag,
                first: existing.location.clone(),
                location: item.location,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&MetadataItem> {
        self.items.iter().find(|i| i.tag == tag)
    }

    pub fn value(&self, tag: &str) -> Option<&MetadataValue> {
        self.get(tag).map(|i| &i.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when no attached tag creates a new type (only description/plural).
    pub fn only_alias_tags(&self) -> bool {
        self.items
            .iter()
            .all(|i| lookup(&i.tag).is_some_and(|spec| !spec.creates_new_type))
    }

    /// `self` layered over `base`: tags present here replace those in `base`.
    pub fn overlay(&self, base: &MetadataMap) -> MetadataMap {
        let mut items: Vec<MetadataItem> = base
            .items
            .iter()
            .filter(|i| self.get(&i.tag).is_none())
            .cloned()
            .collect();
        items.extend(self.items.iter().cloned());
        MetadataMap { items }
    }

    /// Value of a tag, falling back to the catalog default.
    pub fn value_or_default(&self, tag: &str, owner: Option<&str>) -> Option<MetadataValue> {
        self.value(tag)
            .cloned()
            .or_else(|| lookup(tag).and_then(|spec| spec.default_value(owner)))
    }
}

fn check_item(item: &MetadataItem) -> Result<&'static MetadataSpec, SchemaError> {
    let spec = lookup(&item.tag).ok_or_else(|| SchemaError::MetadataConstraint {
        tags: vec![item.tag.clone()],
        message: "unknown metadata tag".to_string(),
        location: item.location.clone(),
    })?;
    if !spec.host.accepts(&item.value) {
        return Err(SchemaError::MetadataConstraint {
            tags: vec![item.tag.clone()],
            message: format!(
                "expected {:?} value, got {}",
                spec.host,
                item.value.type_name()
            )
            .to_lowercase(),
            location: item.location.clone(),
        });
    }
    Ok(spec)
}

/// Check that every tag is known, well-typed and allowed on an object declaration.
pub fn check_object_metadata(metadata: &MetadataMap) -> Result<(), SchemaError> {
    for item in metadata.iter() {
        let spec = check_item(item)?;
        if !spec.applies_to_object() {
            return Err(SchemaError::MetadataConstraint {
                tags: vec![item.tag.clone()],
                message: "does not apply to objects".to_string(),
                location: item.location.clone(),
            });
        }
    }
    Ok(())
}

/// Build the constrained kind for a fundamental declaration from its tags.
///
/// # Errors
///
/// Returns `SchemaError::MetadataConstraint` for unknown, mistyped or
/// inapplicable tags and for violated cross-field invariants, attributed to
/// `location`.
pub fn fundamental_type(
    kind: FundamentalKind,
    metadata: &MetadataMap,
    location: &SourceLocation,
) -> Result<TypeInfo, SchemaError> {
    let mut type_kind = TypeKind::fundamental(kind);

    for item in metadata.iter() {
        let spec = check_item(item)?;
        if !spec.applies_to_fundamental(kind) {
            return Err(SchemaError::MetadataConstraint {
                tags: vec![item.tag.clone()],
                message: format!("does not apply to {}", kind),
                location: item.location.clone(),
            });
        }
        apply(&mut type_kind, item).map_err(|e| e.at(&item.location))?;
    }

    TypeInfo::new(type_kind).map_err(|e| e.at(location))
}

fn apply(kind: &mut TypeKind, item: &MetadataItem) -> Result<(), SchemaError> {
    let tag = item.tag.as_str();
    let non_negative = |v: i64| -> Result<usize, SchemaError> {
        usize::try_from(v).map_err(|_| SchemaError::metadata(&[tag], "must not be negative"))
    };

    match (kind, tag, &item.value) {
        (TypeKind::Int(k), "min", MetadataValue::Integer(v)) => k.min = Some(*v),
        (TypeKind::Int(k), "max", MetadataValue::Integer(v)) => k.max = Some(*v),
        (TypeKind::Int(k), "bytes", MetadataValue::Integer(v)) => {
            k.bytes = Some(
                u8::try_from(*v).map_err(|_| SchemaError::metadata(&[tag], "must be 1, 2, 4 or 8"))?,
            )
        }
        (TypeKind::Int(_), _, MetadataValue::Number(_)) => {
            return Err(SchemaError::metadata(&[tag], "int bounds must be integers"))
        }
        (TypeKind::Float(k), "min", MetadataValue::Integer(v)) => k.min = Some(*v as f64),
        (TypeKind::Float(k), "min", MetadataValue::Number(v)) => k.min = Some(*v),
        (TypeKind::Float(k), "max", MetadataValue::Integer(v)) => k.max = Some(*v as f64),
        (TypeKind::Float(k), "max", MetadataValue::Number(v)) => k.max = Some(*v),
        (TypeKind::String(k), "min_length", MetadataValue::Integer(v)) => {
            k.min_length = non_negative(*v)?
        }
        (TypeKind::String(k), "max_length", MetadataValue::Integer(v)) => {
            k.max_length = Some(non_negative(*v)?)
        }
        (TypeKind::String(k), "validation_expression", MetadataValue::String(v)) => {
            k.validation_expression = Some(Pattern::new(v)?)
        }
        (TypeKind::Enum(k), "values", MetadataValue::List(v)) => k.values = v.clone(),
        (TypeKind::Enum(k), "friendly_values", MetadataValue::List(v)) => {
            k.friendly_values = Some(v.clone())
        }
        (TypeKind::Filename(k), "ensure_exists", MetadataValue::Bool(v)) => k.ensure_exists = *v,
        (TypeKind::Filename(k), "match_any", MetadataValue::Bool(v)) => k.match_any = *v,
        (TypeKind::Directory(k), "ensure_exists", MetadataValue::Bool(v)) => k.ensure_exists = *v,
        // description, plural
        _ => {}
    }
    Ok(())
}

/// Cross-field invariants of every kind.
pub struct ConstraintCheck;

type Checked = Result<(), SchemaError>;

impl TypeVisitor for ConstraintCheck {
    type Output = Checked;

    fn visit_bool(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> Checked {
        if let (Some(min), Some(max)) = (kind.min, kind.max) {
            if min > max {
                return Err(SchemaError::metadata(
                    &["min", "max"],
                    format!("min ({}) is greater than max ({})", min, max),
                ));
            }
        }
        if let Some(bytes) = kind.bytes {
            let (lo, hi) = kind.width_bounds().ok_or_else(|| {
                SchemaError::metadata(&["bytes"], format!("{} is not 1, 2, 4 or 8", bytes))
            })?;
            for (tag, bound) in [("min", kind.min), ("max", kind.max)] {
                if let Some(v) = bound {
                    if v < lo || v > hi {
                        return Err(SchemaError::metadata(
                            &["bytes", tag],
                            format!("{} ({}) does not fit in {} byte(s)", tag, v, bytes),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> Checked {
        for (tag, bound) in [("min", kind.min), ("max", kind.max)] {
            if bound.is_some_and(|v| v.is_nan()) {
                return Err(SchemaError::metadata(&[tag], "must be a number"));
            }
        }
        if let (Some(min), Some(max)) = (kind.min, kind.max) {
            if min > max {
                return Err(SchemaError::metadata(
                    &["min", "max"],
                    format!("min ({}) is greater than max ({})", min, max),
                ));
            }
        }
        Ok(())
    }

    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> Checked {
        if let Some(max) = kind.max_length {
            if kind.min_length > max {
                return Err(SchemaError::metadata(
                    &["min_length", "max_length"],
                    format!(
                        "min_length ({}) is greater than max_length ({})",
                        kind.min_length, max
                    ),
                ));
            }
            if max == 0 {
                return Err(SchemaError::metadata(&["max_length"], "must be at least 1"));
            }
        }
        Ok(())
    }

    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> Checked {
        if kind.values.is_empty() {
            return Err(SchemaError::metadata(&["values"], "at least one value is required"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = kind.values.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(SchemaError::metadata(
                &["values"],
                format!("\"{}\" appears more than once", dup),
            ));
        }
        if let Some(friendly) = &kind.friendly_values {
            if friendly.len() != kind.values.len() {
                return Err(SchemaError::metadata(
                    &["values", "friendly_values"],
                    format!(
                        "{} value(s) but {} friendly value(s)",
                        kind.values.len(),
                        friendly.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn visit_date(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_time(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> Checked {
        Ok(())
    }

    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Checked {
        Ok(())
    }

    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Checked {
        Ok(())
    }

    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Checked {
        check_members(kind)
    }

    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> Checked {
        check_members(kind)
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Checked {
        if kind.alternatives.is_empty() {
            return Err(SchemaError::metadata(
                &["alternatives"],
                "at least one alternative is required",
            ));
        }
        Ok(())
    }
}

fn check_members(kind: &ClassKind) -> Checked {
    let mut seen = HashSet::new();
    for member in &kind.members {
        if member.name.is_empty() {
            return Err(SchemaError::metadata(&["members"], "member names must not be empty"));
        }
        if !seen.insert(member.name.as_str()) {
            return Err(SchemaError::metadata(
                &["members"],
                format!("member \"{}\" appears more than once", member.name),
            ));
        }
    }
    Ok(())
}
