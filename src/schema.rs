//! Schema module for vecquery.
//!
//! The schema declares the fields an index knows about and, for dense vector
//! fields, their dimension, element encoding and similarity function.

pub mod field;
#[allow(clippy::module_inception)]
pub mod schema;

pub use field::{FieldDefinition, FieldType};
pub use schema::Schema;
