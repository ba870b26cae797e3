//! Typed validation layer: one closed kind hierarchy with visitor dispatch.
//!
//! A [`TypeInfo`] pairs an [`Arity`] with one of 16 kinds. Every component that
//! needs kind-specific behaviour (validation, string serialization, schema
//! conversion, constraint checking) implements [`TypeVisitor`]; the only place
//! that inspects the kind is [`TypeInfo::accept`].
//!
//! ```
//! use decl_schema::{Arity, IntKind, TypeInfo, TypeKind, Value};
//!
//! let ti = TypeInfo::new(TypeKind::Int(IntKind::range(2, 10)))
//!     .unwrap()
//!     .with_arity(Arity::new(2, Some(4)).unwrap());
//!
//! assert!(ti.validate(&Value::from(vec![Value::Int(2), Value::Int(3)])).is_ok());
//! assert!(ti.validate(&Value::from(vec![Value::Int(2)])).is_err());
//! assert!(ti.validate(&Value::from(vec![Value::Int(2), Value::Int(11)])).is_err());
//! ```

mod descriptor;
mod kinds;
mod validate;

use std::fmt;
use std::sync::Arc;

use crate::arity::Arity;
use crate::error::SchemaError;
use crate::metadata::ConstraintCheck;
use crate::types::Value;

pub use descriptor::TypeDescriptor;
pub use kinds::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, FundamentalKind,
    IntKind, Member, Pattern, StringKind,
};

/// The 13 fundamental and 3 composite kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Bool,
    Int(IntKind),
    Float(FloatKind),
    String(StringKind),
    Enum(EnumKind),
    Date,
    Time,
    DateTime,
    Duration,
    Guid,
    Uri,
    Filename(FilenameKind),
    Directory(DirectoryKind),
    Class(ClassKind),
    Dict(ClassKind),
    AnyOf(AnyOfKind),
}

impl TypeKind {
    /// The unconstrained kind for a fundamental keyword.
    pub fn fundamental(kind: FundamentalKind) -> Self {
        match kind {
            FundamentalKind::Bool => TypeKind::Bool,
            FundamentalKind::Int => TypeKind::Int(IntKind::default()),
            FundamentalKind::Float => TypeKind::Float(FloatKind::default()),
            FundamentalKind::String => TypeKind::String(StringKind::default()),
            FundamentalKind::Enum => TypeKind::Enum(EnumKind::default()),
            FundamentalKind::Date => TypeKind::Date,
            FundamentalKind::Time => TypeKind::Time,
            FundamentalKind::DateTime => TypeKind::DateTime,
            FundamentalKind::Duration => TypeKind::Duration,
            FundamentalKind::Guid => TypeKind::Guid,
            FundamentalKind::Uri => TypeKind::Uri,
            FundamentalKind::Filename => TypeKind::Filename(FilenameKind::default()),
            FundamentalKind::Directory => TypeKind::Directory(DirectoryKind::default()),
        }
    }
}

/// Caller-supplied check run after the kind's own constraints.
#[derive(Clone)]
pub struct ValidationHook(Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>);

impl ValidationHook {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.0)(value)
    }
}

impl fmt::Debug for ValidationHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidationHook(..)")
    }
}

impl PartialEq for ValidationHook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Immutable description of a value's kind, constraints and cardinality.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    arity: Arity,
    kind: TypeKind,
    hook: Option<ValidationHook>,
}

impl TypeInfo {
    /// Create a single-arity TypeInfo, checking the kind's constraints.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::MetadataConstraint` when constraints contradict
    /// each other (e.g. `min > max`, mismatched enum friendly values).
    pub fn new(kind: TypeKind) -> Result<Self, SchemaError> {
        let info = Self {
            arity: Arity::single(),
            kind,
            hook: None,
        };
        info.accept(&mut ConstraintCheck)?;
        Ok(info)
    }

    /// Same type with a different arity.
    #[must_use]
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Same type with an additional validation hook.
    #[must_use]
    pub fn with_validation(mut self, hook: ValidationHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn arity(&self) -> &Arity {
        &self.arity
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn validation_hook(&self) -> Option<&ValidationHook> {
        self.hook.as_ref()
    }

    /// Keyword naming this kind (`int`, `class`, `any_of`, ...).
    pub fn kind_name(&self) -> &'static str {
        self.accept(&mut KindName)
    }

    /// Dispatch to the visitor method for this kind.
    pub fn accept<V: TypeVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            TypeKind::Bool => visitor.visit_bool(self),
            TypeKind::Int(k) => visitor.visit_int(self, k),
            TypeKind::Float(k) => visitor.visit_float(self, k),
            TypeKind::String(k) => visitor.visit_string(self, k),
            TypeKind::Enum(k) => visitor.visit_enum(self, k),
            TypeKind::Date => visitor.visit_date(self),
            TypeKind::Time => visitor.visit_time(self),
            TypeKind::DateTime => visitor.visit_date_time(self),
            TypeKind::Duration => visitor.visit_duration(self),
            TypeKind::Guid => visitor.visit_guid(self),
            TypeKind::Uri => visitor.visit_uri(self),
            TypeKind::Filename(k) => visitor.visit_filename(self, k),
            TypeKind::Directory(k) => visitor.visit_directory(self, k),
            TypeKind::Class(k) => visitor.visit_class(self, k),
            TypeKind::Dict(k) => visitor.visit_dict(self, k),
            TypeKind::AnyOf(k) => visitor.visit_any_of(self, k),
        }
    }
}

/// One method per kind. Implementations must handle every kind.
pub trait TypeVisitor {
    type Output;

    fn visit_bool(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_int(&mut self, info: &TypeInfo, kind: &IntKind) -> Self::Output;
    fn visit_float(&mut self, info: &TypeInfo, kind: &FloatKind) -> Self::Output;
    fn visit_string(&mut self, info: &TypeInfo, kind: &StringKind) -> Self::Output;
    fn visit_enum(&mut self, info: &TypeInfo, kind: &EnumKind) -> Self::Output;
    fn visit_date(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_time(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_date_time(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_duration(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_guid(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_uri(&mut self, info: &TypeInfo) -> Self::Output;
    fn visit_filename(&mut self, info: &TypeInfo, kind: &FilenameKind) -> Self::Output;
    fn visit_directory(&mut self, info: &TypeInfo, kind: &DirectoryKind) -> Self::Output;
    fn visit_class(&mut self, info: &TypeInfo, kind: &ClassKind) -> Self::Output;
    fn visit_dict(&mut self, info: &TypeInfo, kind: &ClassKind) -> Self::Output;
    fn visit_any_of(&mut self, info: &TypeInfo, kind: &AnyOfKind) -> Self::Output;
}

struct KindName;

impl TypeVisitor for KindName {
    type Output = &'static str;

    fn visit_bool(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Bool.name()
    }
    fn visit_int(&mut self, _: &TypeInfo, _: &IntKind) -> &'static str {
        FundamentalKind::Int.name()
    }
    fn visit_float(&mut self, _: &TypeInfo, _: &FloatKind) -> &'static str {
        FundamentalKind::Float.name()
    }
    fn visit_string(&mut self, _: &TypeInfo, _: &StringKind) -> &'static str {
        FundamentalKind::String.name()
    }
    fn visit_enum(&mut self, _: &TypeInfo, _: &EnumKind) -> &'static str {
        FundamentalKind::Enum.name()
    }
    fn visit_date(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Date.name()
    }
    fn visit_time(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Time.name()
    }
    fn visit_date_time(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::DateTime.name()
    }
    fn visit_duration(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Duration.name()
    }
    fn visit_guid(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Guid.name()
    }
    fn visit_uri(&mut self, _: &TypeInfo) -> &'static str {
        FundamentalKind::Uri.name()
    }
    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> &'static str {
        FundamentalKind::Filename.name()
    }
    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> &'static str {
        FundamentalKind::Directory.name()
    }
    fn visit_class(&mut self, _: &TypeInfo, _: &ClassKind) -> &'static str {
        "class"
    }
    fn visit_dict(&mut self, _: &TypeInfo, _: &ClassKind) -> &'static str {
        "dict"
    }
    fn visit_any_of(&mut self, _: &TypeInfo, _: &AnyOfKind) -> &'static str {
        "any_of"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_constraints() {
        let err = TypeInfo::new(TypeKind::Int(IntKind::range(10, 2))).unwrap_err();
        assert!(matches!(err, SchemaError::MetadataConstraint { .. }));
    }

    #[test]
    fn with_arity_keeps_kind() {
        let ti = TypeInfo::new(TypeKind::Bool)
            .unwrap()
            .with_arity(Arity::zero_or_more());
        assert_eq!(ti.kind(), &TypeKind::Bool);
        assert!(ti.arity().is_zero_or_more());
    }

    #[test]
    fn kind_names() {
        assert_eq!(TypeInfo::new(TypeKind::Date).unwrap().kind_name(), "date");
        assert_eq!(
            TypeInfo::new(TypeKind::Float(FloatKind::default()))
                .unwrap()
                .kind_name(),
            "number"
        );
        let class = TypeInfo::new(TypeKind::Class(ClassKind::default())).unwrap();
        assert_eq!(class.kind_name(), "class");
    }

    #[test]
    fn fundamental_kind_maps_to_unconstrained_type() {
        for kind in FundamentalKind::ALL {
            if kind == FundamentalKind::Enum {
                // enums need at least one value
                continue;
            }
            let ti = TypeInfo::new(TypeKind::fundamental(kind)).unwrap();
            assert_eq!(ti.kind_name(), kind.name());
        }
    }

    #[test]
    fn hooks_compare_by_identity() {
        let hook = ValidationHook::new(|_| Ok(()));
        let a = TypeInfo::new(TypeKind::Bool)
            .unwrap()
            .with_validation(hook.clone());
        let b = TypeInfo::new(TypeKind::Bool).unwrap().with_validation(hook);
        let c = TypeInfo::new(TypeKind::Bool)
            .unwrap()
            .with_validation(ValidationHook::new(|_| Ok(())));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
