#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Declarative schema subset and validator for Harbor stored values.
//!
//! A [`Schema`] describes the expected shape of a JSON value: strings,
//! numbers, integers, booleans, arrays (uniform or fixed-arity tuples) and
//! closed objects. [`validate`] checks a `serde_json::Value` against a
//! schema and returns a plain boolean verdict.
//!
//! Validation never coerces. A value that fails a constraint yields
//! `Ok(false)`; only a *malformed schema* (invalid regex pattern,
//! non-positive `multipleOf`, `required` naming an undeclared property)
//! yields an error — a configuration mistake by the schema author, kept
//! strictly distinct from a data mismatch.
//!
//! # Example
//!
//! ```rust
//! use harbor_schema::{validate, ObjectSchema, Schema, StringSchema};
//! use serde_json::json;
//!
//! let schema = Schema::Object(ObjectSchema {
//!     properties: [("name".to_owned(), Schema::String(StringSchema::default()))]
//!         .into_iter()
//!         .collect(),
//!     required: Some(vec!["name".to_owned()]),
//! });
//!
//! assert!(validate(&json!({ "name": "harbor" }), &schema).unwrap());
//! assert!(!validate(&json!({ "name": 42 }), &schema).unwrap());
//! ```

pub mod error;
pub mod types;
pub mod validate;

pub use error::{SchemaError, SchemaResult};
pub use types::{
    ArrayItems, ArraySchema, BooleanSchema, NumberSchema, ObjectSchema, Schema, StringSchema,
};
pub use validate::validate;
