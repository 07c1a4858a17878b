//! # vecquery
//!
//! Dense vector similarity and k-nearest-neighbor query building for search
//! engines.
//!
//! ## Features
//!
//! - Parsing and validation of vector literals (`[1.0,2.0,3.0]`)
//! - Similarity functions (euclidean, cosine, dot product) in raw and bounded score form
//! - Per-document vector sources with a forward-only cursor
//! - KNN query building with pre-filter / post-filter resolution
//! - Function queries that compose vector similarity with numeric expressions

pub mod embedding;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod search;
pub mod util;
pub mod vector;

pub mod prelude {
    pub use crate::error::{Result, VecQueryError};
    pub use crate::index::{DocSet, KnnSearcher, MemoryIndex, ScoredDoc, SegmentReader};
    pub use crate::query::filter::{Filter, FilterDirective};
    pub use crate::query::knn::{ExecutionContext, KnnQueryBuilder, KnnRequest};
    pub use crate::schema::{FieldType, Schema};
    pub use crate::search::{Clause, SearchExecutor, SearchRequest};
    pub use crate::vector::{SimilarityFunction, VectorLiteral, VectorValueSource};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
