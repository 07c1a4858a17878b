//! Error types for the vecquery library.
//!
//! All failures are represented by the [`VecQueryError`] enum. The variants
//! that describe a bad request carry the complete user-facing message, so the
//! `Display` output of those variants is exactly the diagnostic shown to the
//! caller.
//!
//! # Examples
//!
//! ```
//! use vecquery::error::{Result, VecQueryError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(VecQueryError::missing_vector_field())
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => assert_eq!(e.to_string(), "the vector field 'f' is missing"),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::vector::core::vector::VectorEncoding;

/// The main error type for vecquery operations.
#[derive(Error, Debug)]
pub enum VecQueryError {
    /// A vector literal is not enclosed in square brackets.
    #[error("{0}")]
    MalformedVectorFormat(String),

    /// A vector literal element cannot be parsed as the expected element kind.
    #[error("{0}")]
    MalformedVectorElement(String),

    /// Two vectors (or a vector and a field) disagree on dimension.
    #[error("{0}")]
    VectorDimensionMismatch(String),

    /// A similarity operand does not resolve to a vector value.
    #[error("{0}")]
    WrongOperandType(String),

    /// A forward-only vector cursor was asked to rewind.
    #[error("{0}")]
    OutOfOrderAccess(String),

    /// Local parameters that cannot be used together (or in this position).
    #[error("{0}")]
    IncompatibleLocalParams(String),

    /// A required parameter is absent.
    #[error("{0}")]
    MissingRequiredParameter(String),

    /// A parameter value cannot be accepted.
    #[error("{0}")]
    InvalidParameterValue(String),

    /// The target field cannot hold vectors.
    #[error("{0}")]
    UnsupportedFieldType(String),

    /// Schema-related errors (undefined or duplicate fields).
    #[error("{0}")]
    Schema(String),

    /// Query syntax errors in filter or function expressions.
    #[error("Query error: {0}")]
    Query(String),

    /// Failures reported by the index collaborator.
    #[error("Index error: {0}")]
    Index(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors surfaced by collaborators.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with VecQueryError.
pub type Result<T> = std::result::Result<T, VecQueryError>;

impl VecQueryError {
    /// The literal is not of the form `[e1,e2,...]`.
    pub fn malformed_vector_format(encoding: VectorEncoding) -> Self {
        VecQueryError::MalformedVectorFormat(format!(
            "incorrect vector format. {}",
            encoding.format_hint()
        ))
    }

    /// One element of the literal is not a valid value for `encoding`.
    ///
    /// `token` is reported verbatim, including surrounding whitespace.
    pub fn malformed_vector_element(token: &str, encoding: VectorEncoding) -> Self {
        VecQueryError::MalformedVectorElement(format!(
            "incorrect vector element: '{token}'. {}",
            encoding.format_hint()
        ))
    }

    /// A parsed literal does not match the dimension declared by its field.
    pub fn field_dimension_mismatch(actual: usize, expected: usize) -> Self {
        VecQueryError::VectorDimensionMismatch(format!(
            "incorrect vector dimension. The vector value has size {actual} while it is expected a vector with size {expected}"
        ))
    }

    /// Two vectors handed to a similarity function differ in length.
    pub fn vector_dimensions_differ(first: usize, second: usize) -> Self {
        VecQueryError::VectorDimensionMismatch(format!(
            "vector dimensions differ: {first}!={second}"
        ))
    }

    /// A similarity operand is not a vector.
    pub fn wrong_operand_type() -> Self {
        VecQueryError::WrongOperandType(
            "Wrong parameter type: The input is not a vector value".to_string(),
        )
    }

    /// A field cursor was asked for a document before the last one it served.
    pub fn out_of_order(last_doc: u32, doc: u32) -> Self {
        VecQueryError::OutOfOrderAccess(format!(
            "docs were sent out-of-order: lastDocID={last_doc} vs docID={doc}"
        ))
    }

    /// Create a new incompatible local params error.
    pub fn incompatible_local_params<S: Into<String>>(msg: S) -> Self {
        VecQueryError::IncompatibleLocalParams(msg.into())
    }

    /// The `f` local parameter is absent.
    pub fn missing_vector_field() -> Self {
        VecQueryError::MissingRequiredParameter("the vector field 'f' is missing".to_string())
    }

    /// Neither `v` nor the clause body supplies a vector.
    pub fn missing_vector_value() -> Self {
        VecQueryError::MissingRequiredParameter(
            "the vector value 'v' to search is missing".to_string(),
        )
    }

    /// Create a new invalid parameter value error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        VecQueryError::InvalidParameterValue(msg.into())
    }

    /// The field exists but is not a dense vector field.
    pub fn unsupported_field_type(field: &str, type_name: &str) -> Self {
        VecQueryError::UnsupportedFieldType(format!(
            "only dense vector fields are compatible with the knn query parser, field '{field}' is of type {type_name}"
        ))
    }

    /// The field is not declared in the schema.
    pub fn undefined_field(field: &str) -> Self {
        VecQueryError::Schema(format!("undefined field: \"{field}\""))
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        VecQueryError::Schema(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        VecQueryError::Query(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        VecQueryError::Index(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        VecQueryError::InvalidConfig(msg.into())
    }

    /// Whether this error was caused by the request rather than the service.
    ///
    /// Client errors are never retried. Collaborator failures are transient.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            VecQueryError::Index(_) | VecQueryError::Io(_) | VecQueryError::Anyhow(_)
        )
    }
}
