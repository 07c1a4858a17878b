//! Segment reader traits consumed by vector sources, filters and functions.

use crate::error::Result;
use crate::index::doc_set::DocSet;

/// Sentinel returned by [`VectorIterator::advance`] once the iterator is exhausted.
pub const NO_MORE_DOCS: u32 = u32::MAX;

/// Forward-only iterator over the documents of one segment that hold a
/// vector in a given field.
pub trait VectorIterator {
    /// Current document, or `None` before the first call to `advance`.
    ///
    /// Returns `Some(NO_MORE_DOCS)` once exhausted.
    fn doc_id(&self) -> Option<u32>;

    /// Move to the first document at or after `target` and return it.
    ///
    /// Callers only advance to targets past the current document.
    fn advance(&mut self, target: u32) -> Result<u32>;

    /// Vector of the current document, widened to floats.
    fn vector_value(&self) -> &[f32];
}

/// Read access to one index segment.
pub trait SegmentReader: Send + Sync + std::fmt::Debug {
    /// Upper bound (exclusive) of document ids in this segment.
    fn max_doc(&self) -> u32;

    /// Vector iterator for a dense vector field, `None` when no document in
    /// this segment holds a value.
    fn vector_values(&self, field: &str) -> Result<Option<Box<dyn VectorIterator + '_>>>;

    /// Numeric doc value of `field` for `doc`.
    fn numeric_value(&self, field: &str, doc: u32) -> Result<Option<f64>>;

    /// Documents whose keyword `field` holds `term`.
    fn term_docs(&self, field: &str, term: &str) -> Result<DocSet>;

    /// Stored unique id of a document.
    fn stored_id(&self, doc: u32) -> Option<String>;

    /// Documents that are not deleted.
    fn live_docs(&self) -> DocSet {
        DocSet::full(self.max_doc())
    }
}
