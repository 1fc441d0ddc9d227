//! Error types for the transform and the count executor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors raised while transforming an annotated schema.
///
/// Every variant names the offending type (and field, where there is one) so the
/// author can find the annotation that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("failed to parse schema: {0}")]
    Parse(String),

    #[error(
        "type '{type_name}' is annotated with @count but not @model; any type annotated with @count must also be annotated with @model"
    )]
    MissingModelAnnotation { type_name: String },

    #[error(
        "field '{type_name}.{field_name}' is annotated with @count but carries no {expected} annotation (@count needs a @hasMany relationship or an @index to find the backing table)"
    )]
    MissingRelationshipAnnotation {
        type_name: String,
        field_name: String,
        expected: &'static str,
    },

    #[error("field '{type_name}.{field_name}' is annotated with @count but its type '{found}' is not a list")]
    NotAListType {
        type_name: String,
        field_name: String,
        found: String,
    },

    #[error("@count on '{type_name}.{field_name}' references unknown field '{unknown}' on type '{type_name}'")]
    UnknownField {
        type_name: String,
        field_name: String,
        unknown: String,
    },

    #[error("@count on '{type_name}.{field_name}' has an empty 'fields' list")]
    EmptyFieldList { type_name: String, field_name: String },

    #[error("@count on '{type_name}.{field_name}' cannot use '{type_name}.{counter}' as a counter: {reason}")]
    InvalidCounterField {
        type_name: String,
        field_name: String,
        counter: String,
        reason: String,
    },

    #[error(
        "count field '{bound_type}.{field_name}' for type '{type_name}' collides with the one generated for '{existing_type}'"
    )]
    ConflictingBinding {
        bound_type: String,
        field_name: String,
        type_name: String,
        existing_type: String,
    },

    #[error("@count on '{type_name}.{field_name}' targets '{related}', which is not an object type in the schema")]
    UnresolvableRelatedType {
        type_name: String,
        field_name: String,
        related: String,
    },

    #[error("@count on '{type_name}.{field_name}' uses count type '{count_type}', which is not supported")]
    UnsupportedCountType {
        type_name: String,
        field_name: String,
        count_type: String,
    },

    #[error("@count on '{type_name}.{field_name}' has an invalid '{argument}' argument: {reason}")]
    InvalidArgument {
        type_name: String,
        field_name: String,
        argument: String,
        reason: String,
    },

    #[error("generated schema is not well formed: {0}")]
    InvalidOutputSchema(String),
}

pub type TransformResult<T> = Result<T, TransformError>;

/// A filter value that cannot be encoded for the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("filter value at '{path}' is null and cannot be encoded")]
    NullLeaf { path: String },
}

/// Errors surfaced by a [`ScanStore`](crate::executor::ScanStore).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the request because of provisioned throughput or rate limits.
    #[error("scan of '{table}' was throttled: {message}")]
    Throttled { table: String, message: String },

    /// The store refused the request itself (bad expression, missing table).
    #[error("scan of '{table}' was rejected ({code}): {message}")]
    Rejected {
        table: String,
        code: String,
        message: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_throttling(&self) -> bool {
        matches!(self, StoreError::Throttled { .. })
    }

    /// Error type name reported back through the gateway.
    pub fn error_type(&self) -> &str {
        match self {
            StoreError::Throttled { .. } => "ProvisionedThroughputExceededException",
            StoreError::Rejected { code, .. } => code,
            StoreError::Unavailable(_) => "ServiceUnavailable",
        }
    }
}

/// Errors raised by the count executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("malformed count event: {0}")]
    MalformedEvent(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("scan of '{table}' stopped after {pages} pages ({partial_count} items counted so far)")]
    PageLimitExceeded {
        table: String,
        pages: u32,
        partial_count: u64,
    },

    #[error("scan of '{table}' exceeded its {deadline_ms}ms deadline ({partial_count} items counted so far)")]
    DeadlineExceeded {
        table: String,
        deadline_ms: u128,
        partial_count: u64,
    },
}

impl ExecutorError {
    pub fn error_type(&self) -> &str {
        match self {
            ExecutorError::MalformedEvent(_) => "MalformedEvent",
            ExecutorError::Encoding(_) => "FilterEncodingError",
            ExecutorError::Store(e) => e.error_type(),
            ExecutorError::PageLimitExceeded { .. } => "PageLimitExceeded",
            ExecutorError::DeadlineExceeded { .. } => "DeadlineExceeded",
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            message: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }
}

/// Error object carried over the gateway boundary: `{message, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl std::fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

impl std::error::Error for ErrorObject {}
