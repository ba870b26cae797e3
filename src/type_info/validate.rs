//! Value validation and normalization.

use std::collections::BTreeMap;

use super::{
    AnyOfKind, ClassKind, DirectoryKind, EnumKind, FilenameKind, FloatKind, IntKind, StringKind,
    TypeInfo, TypeVisitor,
};
use crate::error::ValidationError;
use crate::loader::normalize_path;
use crate::types::{value_type_name, Value};

impl TypeInfo {
    /// Validate a value: arity first, then every item.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, with a path to the offending item.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.validate_arity(value)?;

        match value {
            Value::Null => Ok(()),
            Value::List(items) if self.arity().is_collection() => {
                for (i, item) in items.iter().enumerate() {
                    self.validate_item(item)
                        .map_err(|e| e.within(&i.to_string()))?;
                }
                Ok(())
            }
            item => self.validate_item(item),
        }
    }

    /// Check scalar/collection shape and item counts against the arity.
    pub fn validate_arity(&self, value: &Value) -> Result<(), ValidationError> {
        let arity = self.arity();

        if value.is_null() {
            return if arity.min() == 0 {
                Ok(())
            } else {
                Err(ValidationError::new(format!(
                    "a value is required (arity {})",
                    arity
                )))
            };
        }

        if arity.is_collection() {
            let items = value.as_list().ok_or_else(|| {
                ValidationError::new(format!(
                    "expected a collection (arity {}), got {}",
                    arity,
                    value_type_name(value)
                ))
            })?;
            if !arity.accepts_count(items.len()) {
                let bound = if (items.len() as u64) < u64::from(arity.min()) {
                    format!("at least {}", arity.min())
                } else {
                    format!("at most {}", arity.max().unwrap_or(u32::MAX))
                };
                return Err(ValidationError::new(format!(
                    "expected {} item(s), got {}",
                    bound,
                    items.len()
                )));
            }
            Ok(())
        } else if value.as_list().is_some() {
            Err(ValidationError::new(format!(
                "expected a single value (arity {}), got a list",
                arity
            )))
        } else {
            Ok(())
        }
    }

    /// Validate one item: host type, kind constraints, then the validation hook.
    pub fn validate_item(&self, value: &Value) -> Result<(), ValidationError> {
        self.accept(&mut ItemValidator { value })?;
        if let Some(hook) = self.validation_hook() {
            hook.check(value).map_err(ValidationError::new)?;
        }
        Ok(())
    }

    /// Normalize a validated value; filesystem paths become canonical.
    pub fn postprocess(&self, value: Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::List(items) if self.arity().is_collection() => Value::List(
                items
                    .into_iter()
                    .map(|item| self.accept(&mut Postprocessor { value: Some(item) }))
                    .collect(),
            ),
            item => self.accept(&mut Postprocessor { value: Some(item) }),
        }
    }
}

fn mismatch(expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(format!(
        "expected {}, got {}",
        expected,
        value_type_name(value)
    ))
}

struct ItemValidator<'a> {
    value: &'a Value,
}

type Checked = Result<(), ValidationError>;

impl ItemValidator<'_> {
    fn members(&self, kind: &ClassKind, expected: &str) -> Checked {
        let fields = match (expected, self.value) {
            ("object", Value::Object(fields)) | ("map", Value::Map(fields)) => fields,
            _ => return Err(mismatch(expected, self.value)),
        };

        for member in &kind.members {
            let value = fields.get(&member.name).unwrap_or(&Value::Null);
            member
                .type_info
                .validate(value)
                .map_err(|e| e.within(&member.name))?;
        }

        if kind.require_exact_match {
            if let Some(extra) = fields.keys().find(|k| kind.member(k).is_none()) {
                return Err(ValidationError::new(format!(
                    "\"{}\" is not a member",
                    extra
                )));
            }
        }
        Ok(())
    }
}

impl TypeVisitor for ItemValidator<'_> {
    type Output = Checked;

    fn visit_bool(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Bool(_) => Ok(()),
            other => Err(mismatch("bool", other)),
        }
    }

    fn visit_int(&mut self, _: &TypeInfo, kind: &IntKind) -> Checked {
        let Value::Int(v) = self.value else {
            return Err(mismatch("int", self.value));
        };
        if let Some(min) = kind.min {
            if *v < min {
                return Err(ValidationError::new(format!("{} is less than {}", v, min)));
            }
        }
        if let Some(max) = kind.max {
            if *v > max {
                return Err(ValidationError::new(format!("{} is greater than {}", v, max)));
            }
        }
        if let Some((lo, hi)) = kind.width_bounds() {
            if *v < lo || *v > hi {
                return Err(ValidationError::new(format!(
                    "{} does not fit in {} byte(s)",
                    v,
                    kind.bytes.unwrap_or_default()
                )));
            }
        }
        Ok(())
    }

    fn visit_float(&mut self, _: &TypeInfo, kind: &FloatKind) -> Checked {
        let v = match self.value {
            Value::Float(v) => *v,
            Value::Int(v) => *v as f64,
            other => return Err(mismatch("number", other)),
        };
        if !v.is_finite() {
            return Err(ValidationError::new(format!("{} is not a finite number", v)));
        }
        if let Some(min) = kind.min {
            if v < min {
                return Err(ValidationError::new(format!("{} is less than {}", v, min)));
            }
        }
        if let Some(max) = kind.max {
            if v > max {
                return Err(ValidationError::new(format!("{} is greater than {}", v, max)));
            }
        }
        Ok(())
    }

    fn visit_string(&mut self, _: &TypeInfo, kind: &StringKind) -> Checked {
        let Value::String(s) = self.value else {
            return Err(mismatch("string", self.value));
        };
        let len = s.chars().count();
        if len < kind.min_length {
            return Err(ValidationError::new(format!(
                "{} character(s) found; at least {} expected",
                len, kind.min_length
            )));
        }
        if let Some(max) = kind.max_length {
            if len > max {
                return Err(ValidationError::new(format!(
                    "{} character(s) found; at most {} expected",
                    len, max
                )));
            }
        }
        if let Some(pattern) = &kind.validation_expression {
            if !pattern.is_full_match(s) {
                return Err(ValidationError::new(format!(
                    "\"{}\" does not match \"{}\"",
                    s,
                    pattern.as_str()
                )));
            }
        }
        Ok(())
    }

    fn visit_enum(&mut self, _: &TypeInfo, kind: &EnumKind) -> Checked {
        let Value::String(s) = self.value else {
            return Err(mismatch("enum value", self.value));
        };
        if kind.values.iter().any(|v| v == s) {
            Ok(())
        } else {
            Err(ValidationError::new(format!(
                "\"{}\" is not one of {}",
                s,
                kind.values.join(", ")
            )))
        }
    }

    fn visit_date(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Date(_) => Ok(()),
            other => Err(mismatch("date", other)),
        }
    }

    fn visit_time(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Time(_) => Ok(()),
            other => Err(mismatch("time", other)),
        }
    }

    fn visit_date_time(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::DateTime(_) => Ok(()),
            other => Err(mismatch("datetime", other)),
        }
    }

    fn visit_duration(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Duration(_) => Ok(()),
            other => Err(mismatch("duration", other)),
        }
    }

    fn visit_guid(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Guid(_) => Ok(()),
            other => Err(mismatch("guid", other)),
        }
    }

    fn visit_uri(&mut self, _: &TypeInfo) -> Checked {
        match self.value {
            Value::Uri(_) => Ok(()),
            other => Err(mismatch("uri", other)),
        }
    }

    fn visit_filename(&mut self, _: &TypeInfo, kind: &FilenameKind) -> Checked {
        let Value::Path(path) = self.value else {
            return Err(mismatch("filename", self.value));
        };
        if kind.ensure_exists {
            let found = if kind.match_any {
                path.exists()
            } else {
                path.is_file()
            };
            if !found {
                return Err(ValidationError::new(format!(
                    "\"{}\" is not a valid {}",
                    path.display(),
                    if kind.match_any { "path" } else { "file" }
                )));
            }
        }
        Ok(())
    }

    fn visit_directory(&mut self, _: &TypeInfo, kind: &DirectoryKind) -> Checked {
        let Value::Path(path) = self.value else {
            return Err(mismatch("directory", self.value));
        };
        if kind.ensure_exists && !path.is_dir() {
            return Err(ValidationError::new(format!(
                "\"{}\" is not a valid directory",
                path.display()
            )));
        }
        Ok(())
    }

    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Checked {
        self.members(kind, "object")
    }

    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> Checked {
        self.members(kind, "map")
    }

    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Checked {
        let mut reasons = Vec::with_capacity(kind.alternatives.len());
        for alternative in &kind.alternatives {
            match alternative.validate(self.value) {
                Ok(()) => return Ok(()),
                Err(e) => reasons.push(format!("{}: {}", alternative.kind_name(), e)),
            }
        }
        Err(ValidationError::new(format!(
            "no alternative accepted the value ({})",
            reasons.join("; ")
        )))
    }
}

/// Rebuilds values with canonical paths.
struct Postprocessor {
    value: Option<Value>,
}

impl Postprocessor {
    fn take(&mut self) -> Value {
        self.value.take().unwrap_or(Value::Null)
    }

    fn path(&mut self) -> Value {
        match self.take() {
            Value::Path(p) => Value::Path(normalize_path(&p)),
            other => other,
        }
    }

    fn members(&mut self, kind: &ClassKind) -> Value {
        let rebuild = |fields: BTreeMap<String, Value>| -> BTreeMap<String, Value> {
            fields
                .into_iter()
                .map(|(name, value)| {
                    let value = match kind.member(&name) {
                        Some(member) => member.type_info.postprocess(value),
                        None => value,
                    };
                    (name, value)
                })
                .collect()
        };
        match self.take() {
            Value::Object(fields) => Value::Object(rebuild(fields)),
            Value::Map(fields) => Value::Map(rebuild(fields)),
            other => other,
        }
    }
}

impl TypeVisitor for Postprocessor {
    type Output = Value;

    fn visit_bool(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_int(&mut self, _: &TypeInfo, _: &IntKind) -> Value {
        self.take()
    }
    fn visit_float(&mut self, _: &TypeInfo, _: &FloatKind) -> Value {
        self.take()
    }
    fn visit_string(&mut self, _: &TypeInfo, _: &StringKind) -> Value {
        self.take()
    }
    fn visit_enum(&mut self, _: &TypeInfo, _: &EnumKind) -> Value {
        self.take()
    }
    fn visit_date(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_time(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_date_time(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_duration(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_guid(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_uri(&mut self, _: &TypeInfo) -> Value {
        self.take()
    }
    fn visit_filename(&mut self, _: &TypeInfo, _: &FilenameKind) -> Value {
        self.path()
    }
    fn visit_directory(&mut self, _: &TypeInfo, _: &DirectoryKind) -> Value {
        self.path()
    }
    fn visit_class(&mut self, _: &TypeInfo, kind: &ClassKind) -> Value {
        self.members(kind)
    }
    fn visit_dict(&mut self, _: &TypeInfo, kind: &ClassKind) -> Value {
        self.members(kind)
    }
    fn visit_any_of(&mut self, _: &TypeInfo, kind: &AnyOfKind) -> Value {
        let value = self.take();
        match kind.alternatives.iter().find(|alt| alt.validate(&value).is_ok()) {
            Some(alternative) => alternative.postprocess(value),
            None => value,
        }
    }
}
