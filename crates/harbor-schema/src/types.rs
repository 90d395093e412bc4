//! Schema struct definitions.
//!
//! A schema is a tree of [`Schema`] nodes, discriminated by a `type` tag.
//! Every node carries exactly one discriminant; untyped schemas do not
//! exist in this subset. Constraint fields use their JSON Schema spellings
//! (`maxLength`, `multipleOf`, ...) when serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A declarative description of a JSON value shape.
///
/// Authored by the caller as an immutable value object and passed to
/// [`validate`](crate::validate) alongside the data under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// A UTF-8 string with optional literal, set, length and pattern
    /// constraints.
    String(StringSchema),
    /// Any JSON number.
    Number(NumberSchema),
    /// A JSON number with no fractional part.
    Integer(NumberSchema),
    /// A boolean with an optional literal constraint.
    Boolean(BooleanSchema),
    /// A uniform array or fixed-arity tuple.
    Array(ArraySchema),
    /// A closed object: only declared properties may be present.
    Object(ObjectSchema),
}

/// Constraints for string values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    /// Exact literal the value must equal.
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<String>,
    /// Set of allowed literals.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Maximum length in Unicode scalar values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Minimum length in Unicode scalar values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Regular expression the value must match (unanchored).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Constraints for number and integer values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSchema {
    /// Exact literal the value must equal.
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<f64>,
    /// Set of allowed literals.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<f64>>,
    /// The value must be an integer multiple of this (must be > 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Exclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Exclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
}

/// Constraints for boolean values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanSchema {
    /// Exact literal the value must equal.
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<bool>,
}

/// Item schemas for an array: one schema applied uniformly, or an ordered
/// sequence of per-position schemas (a tuple).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayItems {
    /// Every element must match the same schema.
    Uniform(Box<Schema>),
    /// Fixed arity: element `i` must match schema `i`, and the array length
    /// must equal the number of schemas.
    Tuple(Vec<Schema>),
}

/// Constraints for array values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    /// Element schema(s). See [`ArrayItems`].
    pub items: ArrayItems,
    /// Maximum number of elements (uniform arrays).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    /// Minimum number of elements (uniform arrays).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    /// Whether all elements must be pairwise distinct by value equality.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

impl ArraySchema {
    /// A uniform array schema with no length or uniqueness constraints.
    #[must_use]
    pub fn uniform(items: Schema) -> Self {
        Self {
            items: ArrayItems::Uniform(Box::new(items)),
            max_items: None,
            min_items: None,
            unique_items: None,
        }
    }

    /// A tuple schema with one sub-schema per position.
    #[must_use]
    pub fn tuple(items: Vec<Schema>) -> Self {
        Self {
            items: ArrayItems::Tuple(items),
            max_items: None,
            min_items: None,
            unique_items: None,
        }
    }
}

/// Constraints for object values.
///
/// Objects are *closed*: a value carrying any property not declared in
/// `properties` fails validation. This defends readers against corrupted
/// or forged stored data smuggling unexpected keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Declared properties and their schemas.
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    /// Property names that must be present. Each must also be declared in
    /// `properties`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}
