//! Schema validation rules.
//!
//! [`validate`] walks the schema tree and the value in lockstep. Constraint
//! well-formedness (regex compilation, `multipleOf > 0`, `required` names
//! declared) is checked *before* the data, so a malformed schema raises the
//! same error no matter what value it is applied to.

// Float comparisons and float division on caller-supplied bounds; no
// overflow or panic paths here.
#![allow(clippy::arithmetic_side_effects, clippy::float_cmp)]

use regex::Regex;
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::types::{
    ArrayItems, ArraySchema, BooleanSchema, NumberSchema, ObjectSchema, Schema, StringSchema,
};

/// Validate a JSON value against a schema.
///
/// Returns `Ok(true)` when the value conforms, `Ok(false)` when it does not
/// (including a type mismatch with the schema's discriminant).
///
/// # Errors
///
/// Returns a [`SchemaError`] only for a malformed schema — never for
/// non-conforming data.
pub fn validate(value: &Value, schema: &Schema) -> SchemaResult<bool> {
    match schema {
        Schema::String(s) => validate_string(value, s),
        Schema::Number(n) => validate_number(value, n, false),
        Schema::Integer(n) => validate_number(value, n, true),
        Schema::Boolean(b) => Ok(validate_boolean(value, b)),
        Schema::Array(a) => validate_array(value, a),
        Schema::Object(o) => validate_object(value, o),
    }
}

fn validate_string(value: &Value, schema: &StringSchema) -> SchemaResult<bool> {
    // Compile the pattern before looking at the data so a bad pattern is
    // reported even for non-string values.
    let pattern = schema
        .pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|e| SchemaError::InvalidPattern {
                pattern: p.to_owned(),
                source: Box::new(e),
            })
        })
        .transpose()?;

    let Some(s) = value.as_str() else {
        return Ok(false);
    };

    if let Some(expected) = &schema.const_value
        && s != expected
    {
        return Ok(false);
    }
    if let Some(allowed) = &schema.enum_values
        && !allowed.iter().any(|a| a == s)
    {
        return Ok(false);
    }

    let len = s.chars().count() as u64;
    if schema.max_length.is_some_and(|max| len > max) {
        return Ok(false);
    }
    if schema.min_length.is_some_and(|min| len < min) {
        return Ok(false);
    }
    if let Some(re) = pattern
        && !re.is_match(s)
    {
        return Ok(false);
    }
    Ok(true)
}

fn validate_number(value: &Value, schema: &NumberSchema, integer: bool) -> SchemaResult<bool> {
    // multipleOf must be strictly positive, otherwise the divisibility
    // check below would divide by zero (or be vacuous for negatives).
    if let Some(m) = schema.multiple_of
        && (m <= 0.0 || m.is_nan())
    {
        return Err(SchemaError::NonPositiveMultipleOf(m));
    }

    let Some(n) = value.as_f64() else {
        return Ok(false);
    };
    if integer && n.fract() != 0.0 {
        return Ok(false);
    }

    if let Some(expected) = schema.const_value
        && n != expected
    {
        return Ok(false);
    }
    if let Some(allowed) = &schema.enum_values
        && !allowed.contains(&n)
    {
        return Ok(false);
    }
    if let Some(m) = schema.multiple_of
        && (n / m).fract() != 0.0
    {
        return Ok(false);
    }
    if schema.maximum.is_some_and(|max| n > max) {
        return Ok(false);
    }
    if schema.exclusive_maximum.is_some_and(|max| n >= max) {
        return Ok(false);
    }
    if schema.minimum.is_some_and(|min| n < min) {
        return Ok(false);
    }
    if schema.exclusive_minimum.is_some_and(|min| n <= min) {
        return Ok(false);
    }
    Ok(true)
}

fn validate_boolean(value: &Value, schema: &BooleanSchema) -> bool {
    match value.as_bool() {
        Some(b) => schema.const_value.is_none_or(|expected| b == expected),
        None => false,
    }
}

fn validate_array(value: &Value, schema: &ArraySchema) -> SchemaResult<bool> {
    let Some(items) = value.as_array() else {
        return Ok(false);
    };

    match &schema.items {
        ArrayItems::Tuple(schemas) => {
            // Fixed arity: length must equal the number of item schemas.
            if items.len() != schemas.len() {
                return Ok(false);
            }
            for (item, item_schema) in items.iter().zip(schemas) {
                if !validate(item, item_schema)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ArrayItems::Uniform(item_schema) => {
            let len = items.len() as u64;
            if schema.max_items.is_some_and(|max| len > max) {
                return Ok(false);
            }
            if schema.min_items.is_some_and(|min| len < min) {
                return Ok(false);
            }
            if schema.unique_items == Some(true) && has_duplicates(items) {
                return Ok(false);
            }
            for item in items {
                if !validate(item, item_schema)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

/// Pairwise duplicate detection by JSON value equality.
fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items.iter().skip(i + 1).any(|b| a == b))
}

fn validate_object(value: &Value, schema: &ObjectSchema) -> SchemaResult<bool> {
    // Undeclared `required` names are a schema-authoring mistake, reported
    // before any data check.
    if let Some(required) = &schema.required {
        for name in required {
            if !schema.properties.contains_key(name) {
                return Err(SchemaError::UndeclaredRequired(name.clone()));
            }
        }
    }

    let Some(map) = value.as_object() else {
        return Ok(false);
    };

    // Closed-object check: any property outside the declared set rejects
    // the value, rather than being silently ignored.
    if map.keys().any(|k| !schema.properties.contains_key(k)) {
        return Ok(false);
    }

    if let Some(required) = &schema.required
        && required.iter().any(|name| !map.contains_key(name))
    {
        return Ok(false);
    }

    for (name, property_schema) in &schema.properties {
        if let Some(property) = map.get(name)
            && !validate(property, property_schema)?
        {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use serde_json::json;

    fn string_schema() -> Schema {
        Schema::String(StringSchema::default())
    }

    fn number_schema() -> Schema {
        Schema::Number(NumberSchema::default())
    }

    #[test]
    fn test_string_type_mismatch() {
        assert!(!validate(&json!(42), &string_schema()).unwrap());
        assert!(validate(&json!("hello"), &string_schema()).unwrap());
    }

    #[test]
    fn test_string_constraints() {
        let schema = Schema::String(StringSchema {
            max_length: Some(5),
            min_length: Some(2),
            pattern: Some("^h".to_owned()),
            ..StringSchema::default()
        });
        assert!(validate(&json!("hello"), &schema).unwrap());
        assert!(!validate(&json!("h"), &schema).unwrap());
        assert!(!validate(&json!("hellohello"), &schema).unwrap());
        assert!(!validate(&json!("oh no"), &schema).unwrap());
    }

    #[test]
    fn test_string_const_and_enum() {
        let schema = Schema::String(StringSchema {
            const_value: Some("on".to_owned()),
            ..StringSchema::default()
        });
        assert!(validate(&json!("on"), &schema).unwrap());
        assert!(!validate(&json!("off"), &schema).unwrap());

        let schema = Schema::String(StringSchema {
            enum_values: Some(vec!["a".to_owned(), "b".to_owned()]),
            ..StringSchema::default()
        });
        assert!(validate(&json!("b"), &schema).unwrap());
        assert!(!validate(&json!("c"), &schema).unwrap());
    }

    #[test]
    fn test_invalid_pattern_is_schema_error() {
        let schema = Schema::String(StringSchema {
            pattern: Some("(unclosed".to_owned()),
            ..StringSchema::default()
        });
        // Raised even when the value is not a string.
        assert!(matches!(
            validate(&json!(1), &schema),
            Err(SchemaError::InvalidPattern { .. })
        ));
        assert!(matches!(
            validate(&json!("text"), &schema),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_integer_rejects_fractional() {
        let schema = Schema::Integer(NumberSchema::default());
        assert!(validate(&json!(4), &schema).unwrap());
        assert!(validate(&json!(-7), &schema).unwrap());
        assert!(!validate(&json!(1.5), &schema).unwrap());
        assert!(!validate(&json!("4"), &schema).unwrap());
    }

    #[test]
    fn test_number_bounds() {
        let schema = Schema::Number(NumberSchema {
            minimum: Some(0.0),
            exclusive_maximum: Some(10.0),
            ..NumberSchema::default()
        });
        assert!(validate(&json!(0), &schema).unwrap());
        assert!(validate(&json!(9.5), &schema).unwrap());
        assert!(!validate(&json!(10), &schema).unwrap());
        assert!(!validate(&json!(-0.1), &schema).unwrap());
    }

    #[test]
    fn test_multiple_of() {
        let schema = Schema::Number(NumberSchema {
            multiple_of: Some(2.5),
            ..NumberSchema::default()
        });
        assert!(validate(&json!(7.5), &schema).unwrap());
        assert!(!validate(&json!(7.0), &schema).unwrap());
    }

    #[test]
    fn test_non_positive_multiple_of_is_schema_error() {
        let schema = Schema::Number(NumberSchema {
            multiple_of: Some(0.0),
            ..NumberSchema::default()
        });
        assert!(matches!(
            validate(&json!(4), &schema),
            Err(SchemaError::NonPositiveMultipleOf(_))
        ));
    }

    #[test]
    fn test_boolean() {
        let schema = Schema::Boolean(BooleanSchema { const_value: None });
        assert!(validate(&json!(true), &schema).unwrap());
        assert!(!validate(&json!("true"), &schema).unwrap());

        let schema = Schema::Boolean(BooleanSchema {
            const_value: Some(false),
        });
        assert!(validate(&json!(false), &schema).unwrap());
        assert!(!validate(&json!(true), &schema).unwrap());
    }

    #[test]
    fn test_uniform_array() {
        let schema = Schema::Array(ArraySchema::uniform(number_schema()));
        assert!(validate(&json!([1, 2, 3]), &schema).unwrap());
        assert!(validate(&json!([]), &schema).unwrap());
        assert!(!validate(&json!([1, "two"]), &schema).unwrap());
        assert!(!validate(&json!("not an array"), &schema).unwrap());
    }

    #[test]
    fn test_array_length_and_uniqueness() {
        let schema = Schema::Array(ArraySchema {
            max_items: Some(3),
            min_items: Some(1),
            unique_items: Some(true),
            ..ArraySchema::uniform(number_schema())
        });
        assert!(validate(&json!([1, 2]), &schema).unwrap());
        assert!(!validate(&json!([]), &schema).unwrap());
        assert!(!validate(&json!([1, 2, 3, 4]), &schema).unwrap());
        assert!(!validate(&json!([1, 2, 1]), &schema).unwrap());
    }

    #[test]
    fn test_tuple_arity() {
        let schema = Schema::Array(ArraySchema::tuple(vec![string_schema(), string_schema()]));
        assert!(validate(&json!(["x", "y"]), &schema).unwrap());
        // Length mismatch: 3 elements against 2 positional schemas.
        assert!(!validate(&json!(["x", "y", "z"]), &schema).unwrap());
        assert!(!validate(&json!(["x"]), &schema).unwrap());
        assert!(!validate(&json!(["x", 2]), &schema).unwrap());
    }

    #[test]
    fn test_closed_object() {
        let schema = Schema::Object(ObjectSchema {
            properties: [("a".to_owned(), number_schema())].into_iter().collect(),
            required: None,
        });
        assert!(validate(&json!({ "a": 1 }), &schema).unwrap());
        // Extra property `b` is not declared.
        assert!(!validate(&json!({ "a": 1, "b": 2 }), &schema).unwrap());
    }

    #[test]
    fn test_required_properties() {
        let schema = Schema::Object(ObjectSchema {
            properties: [
                ("a".to_owned(), number_schema()),
                ("b".to_owned(), string_schema()),
            ]
            .into_iter()
            .collect(),
            required: Some(vec!["a".to_owned()]),
        });
        assert!(validate(&json!({ "a": 1 }), &schema).unwrap());
        assert!(validate(&json!({ "a": 1, "b": "x" }), &schema).unwrap());
        assert!(!validate(&json!({ "b": "x" }), &schema).unwrap());
    }

    #[test]
    fn test_undeclared_required_is_schema_error() {
        let schema = Schema::Object(ObjectSchema {
            properties: BTreeMap::new(),
            required: Some(vec!["ghost".to_owned()]),
        });
        assert!(matches!(
            validate(&json!({}), &schema),
            Err(SchemaError::UndeclaredRequired(_))
        ));
        // Raised even when the value is not an object.
        assert!(matches!(
            validate(&json!(1), &schema),
            Err(SchemaError::UndeclaredRequired(_))
        ));
    }

    #[test]
    fn test_nested_object() {
        let inner = Schema::Object(ObjectSchema {
            properties: [("deep".to_owned(), Schema::Boolean(BooleanSchema::default()))]
                .into_iter()
                .collect(),
            required: Some(vec!["deep".to_owned()]),
        });
        let schema = Schema::Object(ObjectSchema {
            properties: [("inner".to_owned(), inner)].into_iter().collect(),
            required: None,
        });
        assert!(validate(&json!({ "inner": { "deep": true } }), &schema).unwrap());
        assert!(!validate(&json!({ "inner": { "deep": 1 } }), &schema).unwrap());
        assert!(!validate(&json!({ "inner": { "other": true } }), &schema).unwrap());
    }
}
