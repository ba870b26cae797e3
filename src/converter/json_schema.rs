//! JSON Schema fragments.

use serde_json::{json, Map, Value};

use super::Converter;
use crate::arity::Arity;
use crate::error::SchemaError;
use crate::type_info::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, StringKind,
    TypeInfo, TypeVisitor,
};

/// Duration text as written by the serializer.
const DURATION_PATTERN: &str = r"^-?(?:\d+\.)?\d{1,2}:[0-5]?\d:[0-5]?\d(?:\.\d{1,9})?$";

/// Emits JSON Schema as a `serde_json::Value`.
///
/// ```
/// use decl_schema::{Converter, IntKind, JsonSchemaConverter, TypeInfo, TypeKind};
/// use serde_json::json;
///
/// let ti = TypeInfo::new(TypeKind::Int(IntKind::range(2, 10))).unwrap();
/// assert_eq!(
///     JsonSchemaConverter.convert(&ti).unwrap(),
///     json!({"type": "integer", "minimum": 2, "maximum": 10})
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaConverter;

impl Converter for JsonSchemaConverter {
    type Output = Value;

    fn convert_item(&self, ti: &TypeInfo) -> Result<Value, SchemaError> {
        ti.accept(&mut JsonFragment)
    }

    fn collectionize(&self, item: Value, arity: &Arity) -> Value {
        if !arity.is_collection() {
            return item;
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("array"));
        schema.insert("items".into(), item);
        if arity.min() > 1 {
            schema.insert("minItems".into(), json!(arity.min()));
        }
        if let Some(max) = arity.max() {
            schema.insert("maxItems".into(), json!(max));
        }
        Value::Object(schema)
    }
}

type Fragment = Result<Value, SchemaError>;

struct JsonFragment;

fn typed(name: &str) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(name));
    schema
}

fn string_format(format: &str) -> Fragment {
    let mut schema = typed("string");
    schema.insert("format".into(), json!(format));
    Ok(Value::Object(schema))
}

fn object(kind: &ClassKind) -> Fragment {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for member in &kind.members {
        properties.insert(
            member.name.clone(),
            JsonSchemaConverter.convert(&member.type_info)?,
        );
        if member.type_info.arity().min() > 0 {
            required.push(member.name.clone());
        }
    }
    required.sort();

    let mut schema = typed("object");
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    if kind.require_exact_match {
        schema.insert("additionalProperties".into(), Value::Bool(false));
    }
    Ok(Value::Object(schema))
}

impl TypeVisitor for JsonFragment {
    type Output = Fragment;

    fn visit_bool(&mut self, _: &TypeInfo) -> Fragment {
        Ok(Value::Object(typed("boolean")))
    }

    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> Fragment {
        let width = kind.width_bounds();
        let mut schema = typed("integer");
        if let Some(min) = kind.min.or(width.map(|(lo, _)| lo)) {
            schema.insert("minimum".into(), json!(min));
        }
        if let Some(max) = kind.max.or(width.map(|(_, hi)| hi)) {
            schema.insert("maximum".into(), json!(max));
        }
        Ok(Value::Object(schema))
    }

    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> Fragment {
        let mut schema = typed("number");
        if let Some(min) = kind.min {
            schema.insert("minimum".into(), json!(min));
        }
        if let Some(max) = kind.max {
            schema.insert("maximum".into(), json!(max));
        }
        Ok(Value::Object(schema))
    }

    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> Fragment {
        let mut schema = typed("string");
        if kind.min_length > 0 {
            schema.insert("minLength".into(), json!(kind.min_length));
        }
        if let Some(max) = kind.max_length {
            schema.insert("maxLength".into(), json!(max));
        }
        if let Some(expression) = &kind.validation_expression {
            // JSON Schema patterns search; anchor them to match the whole text
            schema.insert(
                "pattern".into(),
                json!(format!("^(?:{})$", expression.as_str())),
            );
        }
        Ok(Value::Object(schema))
    }

    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> Fragment {
        let mut schema = typed("string");
        schema.insert("enum".into(), json!(kind.values));
        Ok(Value::Object(schema))
    }

    fn visit_date(&mut self, _: &TypeInfo) -> Fragment {
        string_format("date")
    }

    fn visit_time(&mut self, _: &TypeInfo) -> Fragment {
        string_format("time")
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> Fragment {
        string_format("date-time")
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> Fragment {
        let mut schema = typed("string");
        schema.insert("pattern".into(), json!(DURATION_PATTERN));
        Ok(Value::Object(schema))
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> Fragment {
        string_format("uuid")
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> Fragment {
        string_format("uri")
    }

    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Fragment {
        Ok(json!({"type": "string", "minLength": 1}))
    }

    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Fragment {
        Ok(json!({"type": "string", "minLength": 1}))
    }

    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Fragment {
        object(kind)
    }

    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> Fragment {
        object(kind)
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Fragment {
        let alternatives = kind
            .alternatives
            .iter()
            .map(|alt| JsonSchemaConverter.convert(alt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({ "anyOf": alternatives }))
    }
}
