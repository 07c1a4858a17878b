//! Field types for schema definition.

use serde::{Deserialize, Serialize};

use crate::vector::core::vector::VectorEncoding;
use crate::vector::similarity::SimilarityFunction;

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// A fixed-dimension vector searched by similarity.
    DenseVector {
        /// Number of elements in every vector.
        dimension: usize,
        /// Element kind.
        #[serde(default)]
        encoding: VectorEncoding,
        /// Similarity used when ranking nearest neighbors.
        #[serde(default)]
        similarity: SimilarityFunction,
    },
    /// Exact-match string terms.
    Keyword,
    /// A single numeric doc value.
    Numeric,
}

impl FieldType {
    /// A float vector field.
    pub fn dense_vector(dimension: usize, similarity: SimilarityFunction) -> Self {
        FieldType::DenseVector {
            dimension,
            encoding: VectorEncoding::Float32,
            similarity,
        }
    }

    /// A byte vector field.
    pub fn byte_vector(dimension: usize, similarity: SimilarityFunction) -> Self {
        FieldType::DenseVector {
            dimension,
            encoding: VectorEncoding::Byte,
            similarity,
        }
    }

    /// Get the name of this field type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::DenseVector { .. } => "DenseVectorField",
            FieldType::Keyword => "KeywordField",
            FieldType::Numeric => "NumericField",
        }
    }

    /// Check if this field holds vectors.
    pub fn is_vector(&self) -> bool {
        matches!(self, FieldType::DenseVector { .. })
    }
}

/// A named field in the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
}

impl FieldDefinition {
    /// Create a new field definition.
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
        }
    }

    /// Vector parameters, when this is a dense vector field.
    pub fn vector_params(&self) -> Option<(usize, VectorEncoding, SimilarityFunction)> {
        match self.field_type {
            FieldType::DenseVector {
                dimension,
                encoding,
                similarity,
            } => Some((dimension, encoding, similarity)),
            _ => None,
        }
    }
}
