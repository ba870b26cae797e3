//! JSON payload validation through the emitted JSON Schema.

use serde_json::Value;

use crate::converter::{Converter, JsonSchemaConverter};
use crate::error::{PayloadError, ValidateError};
use crate::type_info::TypeInfo;

/// Validate a JSON payload against a TypeInfo.
///
/// Converts the TypeInfo to JSON Schema, then validates the payload against it.
///
/// # Errors
///
/// Returns `ValidateError::Schema` if the TypeInfo cannot be converted, or
/// `ValidateError::Invalid` if the payload doesn't match.
pub fn validate_json(ti: &TypeInfo, payload: &Value) -> Result<(), ValidateError> {
    let schema = JsonSchemaConverter.convert(ti)?;
    tracing::debug!(kind = ti.kind_name(), "validating payload against emitted schema");
    validate_against_schema(&schema, payload)
}

/// Validate a payload against an already-emitted schema.
///
/// Use this when validating many payloads against one TypeInfo.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let errors: Vec<PayloadError> = validator
        .iter_errors(payload)
        .map(|e| PayloadError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arity::Arity;
    use crate::type_info::{ClassKind, IntKind, Member, StringKind, TypeKind};
    use serde_json::json;

    fn person() -> TypeInfo {
        TypeInfo::new(TypeKind::Class(ClassKind {
            members: vec![
                Member::new(
                    "name",
                    TypeInfo::new(TypeKind::String(StringKind::default())).unwrap(),
                ),
                Member::new(
                    "age",
                    TypeInfo::new(TypeKind::Int(IntKind::range(0, 150)))
                        .unwrap()
                        .with_arity(Arity::optional()),
                ),
            ],
            require_exact_match: true,
        }))
        .unwrap()
    }

    #[test]
    fn validate_valid_payload() {
        let result = validate_json(&person(), &json!({"name": "Ada", "age": 36}));
        assert!(result.is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let result = validate_json(&person(), &json!({"age": 36}));
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn validate_unknown_member_rejected() {
        let result = validate_json(&person(), &json!({"name": "Ada", "nickname": "A"}));
        assert!(matches!(result, Err(ValidateError::Invalid { .. })));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let result = validate_json(&person(), &json!({"name": "", "age": 200}));
        match result {
            Err(ValidateError::Invalid { errors }) => {
                assert_eq!(errors.len(), 2);
                let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
                assert!(paths.contains(&"/name"));
                assert!(paths.contains(&"/age"));
            }
            other => panic!("expected validation error with 2 errors, got {other:?}"),
        }
    }

    #[test]
    fn validate_collection_bounds() {
        let ti = TypeInfo::new(TypeKind::Int(IntKind::default()))
            .unwrap()
            .with_arity(Arity::new(2, Some(3)).unwrap());
        assert!(validate_json(&ti, &json!([1, 2])).is_ok());
        assert!(validate_json(&ti, &json!([1])).is_err());
        assert!(validate_json(&ti, &json!([1, 2, 3, 4])).is_err());
    }
}
