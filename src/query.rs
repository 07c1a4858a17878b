//! Query building for vector search.
//!
//! # Module Structure
//!
//! - `params`: Multi-valued request parameters
//! - `local_params`: The `{!type key=value}body` local parameter syntax
//! - `filter`: Document filters and tagged filter directives
//! - `filter_parser`: Text to [`filter::Filter`] parsing
//! - `filter_resolver`: Pre-filter / post-filter resolution for KNN clauses
//! - `knn`: KNN query building and execution
//! - `function`: Function queries over vector similarity
//! - `collector`: Top-k and exhaustive hit collection

pub mod collector;
pub mod filter;
pub mod filter_parser;
pub mod filter_resolver;
pub mod function;
pub mod knn;
pub mod local_params;
pub mod params;

pub use self::collector::{Collector, TopDocsCollector};
pub use self::filter::{Filter, FilterDirective};
pub use self::filter_parser::{FilterParser, StandardFilterParser};
pub use self::filter_resolver::{FilterResolver, KnnFilterParams, ResolvedFilters};
pub use self::function::{FunctionExpr, FunctionParser, FunctionQuery};
pub use self::knn::{ExecutionContext, KnnQueryBuilder, KnnRequest};
pub use self::local_params::LocalParams;
pub use self::params::RequestParams;
