//! Schema error types.

/// Errors raised for malformed schemas.
///
/// These indicate a mistake in the caller-authored schema, not in the data
/// under validation. Data mismatches are reported as `Ok(false)` from
/// [`validate`](crate::validate), never through this type.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A string schema carries a `pattern` that is not a valid regex.
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// The regex compile error.
        #[source]
        source: Box<regex::Error>,
    },

    /// A numeric schema carries a `multipleOf` that is not greater than zero.
    #[error("multipleOf must be greater than zero, got {0}")]
    NonPositiveMultipleOf(f64),

    /// An object schema lists a `required` property that `properties` does
    /// not declare.
    #[error("required property {0:?} is not declared in properties")]
    UndeclaredRequired(String),
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
