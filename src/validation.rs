//! Validation of JSON configuration against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use starbucks_provider::schema::{Attribute, Schema};
//! use starbucks_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("capacity", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"name": "Pike Place", "capacity": 40})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "Pike Place", "capacity": "lots"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("capacity".to_string()));
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped
/// - Values must match the attribute type
/// - Attributes not declared in the schema are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if !schema.block.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("This attribute is not declared in the schema")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Err with the diagnostics if invalid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object_type(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

// Object members have no presence flags, so only types are checked.
fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name) {
            let attr_path = format!("{}.{}", path, name);
            validate_attribute_type(attr_type, value, &attr_path, diagnostics);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().is_some(),
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Schema};
    use serde_json::json;

    fn store_like_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("capacity", Attribute::optional_int64())
            .with_attribute(
                "latitude",
                Attribute::new(AttributeType::Float64, AttributeFlags::optional()),
            )
            .with_attribute(
                "has_wifi",
                Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed()),
            )
    }

    #[test]
    fn test_validate_required_string() {
        let schema = store_like_schema();

        assert!(validate(&schema, &json!({"name": "Pike Place"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = store_like_schema();
        assert!(validate(&schema, &json!({"name": "x", "id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = store_like_schema();

        assert!(validate(&schema, &json!({"name": "x", "capacity": 42})).is_empty());
        assert!(validate(&schema, &json!({"name": "x", "capacity": 42.0})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"name": "x", "capacity": 42.5})).len(),
            1
        );
        assert_eq!(
            validate(&schema, &json!({"name": "x", "capacity": "42"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_float_and_bool() {
        let schema = store_like_schema();

        assert!(validate(
            &schema,
            &json!({"name": "x", "latitude": 47.6, "has_wifi": false})
        )
        .is_empty());

        let diagnostics = validate(
            &schema,
            &json!({"name": "x", "latitude": "north", "has_wifi": "yes"}),
        );
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_validate_unsupported_attribute() {
        let schema = store_like_schema();
        let diagnostics = validate(&schema, &json!({"name": "x", "color": "green"}));

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("color".to_string()));
        assert!(diagnostics[0].summary.contains("Unsupported attribute"));
    }

    #[test]
    fn test_validate_list_of_objects() {
        let schema = Schema::v0().with_attribute(
            "stores",
            Attribute::new(
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::String),
                    ("name", AttributeType::String),
                ])),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"stores": [{"id": "s-1", "name": "a"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"stores": [{"id": "s-1"}, {"id": 2}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("stores.1.id".to_string()));

        let diagnostics = validate(&schema, &json!({"stores": "all"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = store_like_schema();
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));

        assert!(validate(&schema, &Value::Null).is_empty());
    }

    #[test]
    fn test_helpers() {
        let schema = store_like_schema();

        assert!(is_valid(&schema, &json!({"name": "x"})));
        assert!(!is_valid(&schema, &json!({})));

        let result = validate_result(&schema, &json!({}));
        assert_eq!(result.unwrap_err().len(), 1);
    }
}
