//! Core vector data structure.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Element kind stored by a dense vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VectorEncoding {
    /// 32-bit floating point elements.
    #[default]
    Float32,
    /// Signed byte elements in `[-128, 127]`.
    Byte,
}

impl VectorEncoding {
    /// Get the name of this encoding.
    pub fn name(&self) -> &'static str {
        match self {
            VectorEncoding::Float32 => "float32",
            VectorEncoding::Byte => "byte",
        }
    }

    /// Describe the literal grammar accepted for this encoding.
    pub fn format_hint(&self) -> &'static str {
        match self {
            VectorEncoding::Float32 => {
                "The expected format is:'[f1,f2..f3]' where each element f is a float"
            }
            VectorEncoding::Byte => {
                "The expected format is:'[b1,b2..b3]' where each element b is a byte (-128 to 127)"
            }
        }
    }
}

/// A parsed, immutable vector literal.
///
/// The element kind is homogeneous; the length is the vector's dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "data", rename_all = "snake_case")]
pub enum VectorLiteral {
    /// Dense float vector.
    Float32(Vec<f32>),
    /// Dense byte vector.
    Byte(Vec<i8>),
}

impl VectorLiteral {
    /// Get the dimensionality of this vector.
    pub fn dimension(&self) -> usize {
        match self {
            VectorLiteral::Float32(data) => data.len(),
            VectorLiteral::Byte(data) => data.len(),
        }
    }

    /// Get the element kind of this vector.
    pub fn encoding(&self) -> VectorEncoding {
        match self {
            VectorLiteral::Float32(_) => VectorEncoding::Float32,
            VectorLiteral::Byte(_) => VectorEncoding::Byte,
        }
    }

    /// View the elements as floats, widening byte elements.
    pub fn as_f32(&self) -> Cow<'_, [f32]> {
        match self {
            VectorLiteral::Float32(data) => Cow::Borrowed(data.as_slice()),
            VectorLiteral::Byte(data) => Cow::Owned(data.iter().map(|&b| f32::from(b)).collect()),
        }
    }

    /// Validate that this vector has the dimension declared by a field.
    pub fn validate_dimension(&self, expected_dim: usize) -> crate::error::Result<()> {
        if self.dimension() != expected_dim {
            return Err(crate::error::VecQueryError::field_dimension_mismatch(
                self.dimension(),
                expected_dim,
            ));
        }
        Ok(())
    }

    /// Check if this vector contains any NaN or infinite values.
    pub fn is_valid(&self) -> bool {
        match self {
            VectorLiteral::Float32(data) => data.iter().all(|x| x.is_finite()),
            VectorLiteral::Byte(_) => true,
        }
    }
}

impl From<Vec<f32>> for VectorLiteral {
    fn from(data: Vec<f32>) -> Self {
        VectorLiteral::Float32(data)
    }
}

impl From<Vec<i8>> for VectorLiteral {
    fn from(data: Vec<i8>) -> Self {
        VectorLiteral::Byte(data)
    }
}

impl fmt::Display for VectorLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorLiteral::Float32(data) => write!(f, "{data:?}"),
            VectorLiteral::Byte(data) => write!(f, "{data:?}"),
        }
    }
}
