//! JSON description of a TypeInfo.
//!
//! ```json
//! {
//!   "kind": "class",
//!   "require_exact_match": true,
//!   "members": [
//!     { "name": "id", "kind": "guid" },
//!     { "name": "tags", "kind": "string", "arity": "*", "max_length": 16 }
//!   ]
//! }
//! ```
//!
//! Validation hooks are code and have no descriptor form.

use serde::{Deserialize, Serialize};

use super::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, Member,
    Pattern, StringKind, TypeInfo, TypeKind, TypeVisitor,
};
use crate::arity::Arity;
use crate::error::SchemaError;

/// Serializable form of a [`TypeInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Arity shorthand; absent means single.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<Arity>,
    #[serde(flatten)]
    pub kind: KindDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindDescriptor {
    Bool,
    Int {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<u8>,
    },
    #[serde(rename = "number")]
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validation_expression: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Enum {
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        friendly_values: Option<Vec<String>>,
    },
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    Duration,
    Guid,
    Uri,
    Filename {
        #[serde(default)]
        ensure_exists: bool,
        #[serde(default)]
        match_any: bool,
    },
    Directory {
        #[serde(default)]
        ensure_exists: bool,
    },
    Class {
        members: Vec<MemberDescriptor>,
        #[serde(default)]
        require_exact_match: bool,
    },
    Dict {
        members: Vec<MemberDescriptor>,
        #[serde(default)]
        require_exact_match: bool,
    },
    AnyOf {
        alternatives: Vec<TypeDescriptor>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub type_info: TypeDescriptor,
}

impl TypeDescriptor {
    /// Build the TypeInfo this descriptor names.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::MetadataConstraint` when the constraints are
    /// inconsistent, exactly as `TypeInfo::new` would.
    pub fn into_type_info(self) -> Result<TypeInfo, SchemaError> {
        let kind = match self.kind {
            KindDescriptor::Bool => TypeKind::Bool,
            KindDescriptor::Int { min, max, bytes } => TypeKind::Int(IntKind { min, max, bytes }),
            KindDescriptor::Float { min, max } => TypeKind::Float(FloatKind { min, max }),
            KindDescriptor::String {
                validation_expression,
                min_length,
                max_length,
            } => TypeKind::String(StringKind {
                validation_expression: validation_expression
                    .as_deref()
                    .map(Pattern::new)
                    .transpose()?,
                min_length: min_length.unwrap_or(StringKind::default().min_length),
                max_length,
            }),
            KindDescriptor::Enum {
                values,
                friendly_values,
            } => TypeKind::Enum(EnumKind {
                values,
                friendly_values,
            }),
            KindDescriptor::Date => TypeKind::Date,
            KindDescriptor::Time => TypeKind::Time,
            KindDescriptor::DateTime => TypeKind::DateTime,
            KindDescriptor::Duration => TypeKind::Duration,
            KindDescriptor::Guid => TypeKind::Guid,
            KindDescriptor::Uri => TypeKind::Uri,
            KindDescriptor::Filename {
                ensure_exists,
                match_any,
            } => TypeKind::Filename(FilenameKind {
                ensure_exists,
                match_any,
            }),
            KindDescriptor::Directory { ensure_exists } => {
                TypeKind::Directory(DirectoryKind { ensure_exists })
            }
            KindDescriptor::Class {
                members,
                require_exact_match,
            } => TypeKind::Class(class_kind(members, require_exact_match)?),
            KindDescriptor::Dict {
                members,
                require_exact_match,
            } => TypeKind::Dict(class_kind(members, require_exact_match)?),
            KindDescriptor::AnyOf { alternatives } => TypeKind::AnyOf(AnyOfKind {
                alternatives: alternatives
                    .into_iter()
                    .map(TypeDescriptor::into_type_info)
                    .collect::<Result<_, _>>()?,
            }),
        };

        let info = TypeInfo::new(kind)?;
        Ok(match self.arity {
            Some(arity) => info.with_arity(arity),
            None => info,
        })
    }
}

fn class_kind(
    members: Vec<MemberDescriptor>,
    require_exact_match: bool,
) -> Result<ClassKind, SchemaError> {
    let members = members
        .into_iter()
        .map(|m| Ok(Member::new(m.name, m.type_info.into_type_info()?)))
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(ClassKind {
        members,
        require_exact_match,
    })
}

impl From<&TypeInfo> for TypeDescriptor {
    fn from(info: &TypeInfo) -> Self {
        let kind = info.accept(&mut Describe);
        let arity = (!info.arity().is_single()).then(|| *info.arity());
        TypeDescriptor { arity, kind }
    }
}

struct Describe;

fn describe_members(kind: &ClassKind) -> Vec<MemberDescriptor> {
    kind.members
        .iter()
        .map(|m| MemberDescriptor {
            name: m.name.clone(),
            type_info: TypeDescriptor::from(&m.type_info),
        })
        .collect()
}

impl TypeVisitor for Describe {
    type Output = KindDescriptor;

    fn visit_bool(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Bool
    }
    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> KindDescriptor {
        KindDescriptor::Int {
            min: kind.min,
            max: kind.max,
            bytes: kind.bytes,
        }
    }
    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> KindDescriptor {
        KindDescriptor::Float {
            min: kind.min,
            max: kind.max,
        }
    }
    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> KindDescriptor {
        let default_min = StringKind::default().min_length;
        KindDescriptor::String {
            validation_expression: kind
                .validation_expression
                .as_ref()
                .map(|p| p.as_str().to_string()),
            min_length: (kind.min_length != default_min).then_some(kind.min_length),
            max_length: kind.max_length,
        }
    }
    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> KindDescriptor {
        KindDescriptor::Enum {
            values: kind.values.clone(),
            friendly_values: kind.friendly_values.clone(),
        }
    }
    fn visit_date(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Date
    }
    fn visit_time(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Time
    }
    fn visit_date_time(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::DateTime
    }
    fn visit_duration(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Duration
    }
    fn visit_guid(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Guid
    }
    fn visit_uri(&mut self, _: &TypeInfo) -> KindDescriptor {
        KindDescriptor::Uri
    }
    fn visit_filename(&mut self, _: &TypeInfo, kind: &FilenameKind) -> KindDescriptor {
        KindDescriptor::Filename {
            ensure_exists: kind.ensure_exists,
            match_any: kind.match_any,
        }
    }
    fn visit_directory(&mut self, _: &TypeInfo, kind: &DirectoryKind) -> KindDescriptor {
        KindDescriptor::Directory {
            ensure_exists: kind.ensure_exists,
        }
    }
    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> KindDescriptor {
        KindDescriptor::Class {
            members: describe_members(kind),
            require_exact_match: kind.require_exact_match,
        }
    }
    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> KindDescriptor {
        KindDescriptor::Dict {
            members: describe_members(kind),
            require_exact_match: kind.require_exact_match,
        }
    }
    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> KindDescriptor {
        KindDescriptor::AnyOf {
            alternatives: kind.alternatives.iter().map(TypeDescriptor::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<TypeInfo, SchemaError> {
        serde_json::from_value::<TypeDescriptor>(value)
            .unwrap()
            .into_type_info()
    }

    #[test]
    fn int_with_arity() {
        let ti = parse(json!({"kind": "int", "min": 2, "max": 10, "arity": "+"})).unwrap();
        assert_eq!(ti.kind(), &TypeKind::Int(IntKind::range(2, 10)));
        assert!(ti.arity().is_one_or_more());
    }

    #[test]
    fn nested_class() {
        let ti = parse(json!({
            "kind": "class",
            "require_exact_match": true,
            "members": [
                {"name": "id", "kind": "guid"},
                {"name": "tags", "kind": "string", "arity": "*", "max_length": 16},
                {"name": "size", "kind": "any_of", "alternatives": [
                    {"kind": "int"}, {"kind": "number"}
                ]}
            ]
        }))
        .unwrap();

        let TypeKind::Class(class) = ti.kind() else {
            panic!("expected class, got {}", ti.kind_name());
        };
        assert!(class.require_exact_match);
        assert_eq!(class.members.len(), 3);
        let tags = class.member("tags").unwrap();
        assert!(tags.type_info.arity().is_zero_or_more());
        assert_eq!(class.member("size").unwrap().type_info.kind_name(), "any_of");
    }

    #[test]
    fn inconsistent_constraints_fail() {
        let err = parse(json!({
            "kind": "enum",
            "values": ["a", "b"],
            "friendly_values": ["x"]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MetadataConstraint { .. }));

        assert!(parse(json!({"kind": "string", "validation_expression": "(["})).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_value::<TypeDescriptor>(json!({"kind": "tuple"})).is_err());
    }

    #[test]
    fn describe_round_trip() {
        let source = json!({
            "kind": "dict",
            "arity": "?",
            "members": [
                {"name": "when", "kind": "datetime"},
                {"name": "path", "kind": "filename", "ensure_exists": true, "match_any": false}
            ],
            "require_exact_match": false
        });
        let ti = parse(source).unwrap();
        let described = TypeDescriptor::from(&ti);
        assert_eq!(described.clone().into_type_info().unwrap(), ti);
        assert_eq!(described.arity, Some(Arity::optional()));
    }
}
