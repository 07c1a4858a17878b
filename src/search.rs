//! Search requests and their execution.
//!
//! # Module Structure
//!
//! - `request`: Clauses, rerank specifications, requests and results
//! - `executor`: Runs a request against one segment

pub mod executor;
pub mod request;

pub use self::executor::SearchExecutor;
pub use self::request::{Clause, Rerank, SearchHit, SearchRequest, SearchResults};
