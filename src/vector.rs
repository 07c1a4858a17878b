//! Dense vector values and the math performed on them.
//!
//! # Module Structure
//!
//! - `core`: Vector literals, element encodings and the literal parser
//! - `similarity`: Similarity functions in raw and bounded score form
//! - `source`: Per-document vector sources (constant or field backed)

pub mod core;
pub mod similarity;
pub mod source;

pub use self::core::parser::{parse_vector, parse_vector_for_field};
pub use self::core::vector::{VectorEncoding, VectorLiteral};
pub use self::similarity::{ScoreMode, SimilarityFunction};
pub use self::source::{FieldCursor, VectorValueSource, VectorValues};
