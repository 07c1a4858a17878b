//! Document filters and tagged filter directives.
//!
//! A [`Filter`] restricts the documents of a segment. Filters attached to a
//! request are wrapped in a [`FilterDirective`], which adds the tags a KNN
//! clause can use to select or deselect them as pre-filters.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::index::doc_set::DocSet;
use crate::index::reader::SegmentReader;

/// A restriction on the documents of a segment.
pub trait Filter: Send + Sync + Debug {
    /// Documents of the segment that pass the filter.
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet>;

    /// Whether the filter inspects the score of the main query.
    ///
    /// Such filters can only run after scoring, so they never narrow a
    /// nearest-neighbor search domain.
    fn requires_scores(&self) -> bool {
        false
    }

    /// Whether a document with `score` passes. Only consulted when
    /// [`Filter::requires_scores`] is true.
    fn accepts_score(&self, score: f32) -> bool {
        let _ = score;
        true
    }

    /// Human readable form of the filter.
    fn description(&self) -> String;
}

/// A filter attached to the request, optionally tagged.
#[derive(Debug, Clone)]
pub struct FilterDirective {
    /// The filter.
    pub filter: Arc<dyn Filter>,
    /// Tags the directive can be selected by.
    pub tags: Vec<String>,
}

impl FilterDirective {
    /// Create an untagged directive.
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        FilterDirective {
            filter,
            tags: Vec::new(),
        }
    }

    /// Create a directive carrying `tags`.
    pub fn tagged<I, S>(filter: Arc<dyn Filter>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterDirective {
            filter,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any of the directive's tags is in `tags`.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|tag| tags.contains(tag))
    }

    /// Whether the filter can only be applied after scoring.
    pub fn requires_scores(&self) -> bool {
        self.filter.requires_scores()
    }
}

/// Intersect the document sets of `filters`.
///
/// Returns `None` when `filters` is empty, meaning "no restriction".
pub fn intersect_filters(
    filters: &[Arc<dyn Filter>],
    reader: &dyn SegmentReader,
) -> Result<Option<DocSet>> {
    let mut result: Option<DocSet> = None;
    for filter in filters {
        let docs = filter.doc_set(reader)?;
        result = Some(match result {
            Some(acc) => acc.intersect(&docs),
            None => docs,
        });
    }
    Ok(result)
}

/// Matches every live document.
#[derive(Debug, Clone, Default)]
pub struct MatchAllFilter;

impl Filter for MatchAllFilter {
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet> {
        Ok(reader.live_docs())
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }
}

/// Matches documents whose `field` holds any of `terms`.
#[derive(Debug, Clone)]
pub struct TermsFilter {
    field: String,
    terms: Vec<String>,
}

impl TermsFilter {
    /// Create a new terms filter.
    pub fn new<S: Into<String>>(field: S, terms: Vec<String>) -> Self {
        TermsFilter {
            field: field.into(),
            terms,
        }
    }
}

impl Filter for TermsFilter {
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet> {
        let mut docs = DocSet::new(reader.max_doc());
        for term in &self.terms {
            docs = docs.union(&reader.term_docs(&self.field, term)?);
        }
        Ok(docs.intersect(&reader.live_docs()))
    }

    fn description(&self) -> String {
        match self.terms.as_slice() {
            [term] => format!("{}:{term}", self.field),
            terms => format!("{}:({})", self.field, terms.join(" ")),
        }
    }
}

/// Matches live documents the inner filter rejects.
#[derive(Debug, Clone)]
pub struct NotFilter {
    inner: Arc<dyn Filter>,
}

impl NotFilter {
    /// Negate `inner`.
    pub fn new(inner: Arc<dyn Filter>) -> Self {
        NotFilter { inner }
    }
}

impl Filter for NotFilter {
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet> {
        Ok(reader.live_docs().difference(&self.inner.doc_set(reader)?))
    }

    fn description(&self) -> String {
        format!("-{}", self.inner.description())
    }
}

/// Matches a precomputed set of documents, such as the hits of a KNN filter.
#[derive(Debug, Clone)]
pub struct DocSetFilter {
    docs: DocSet,
    description: String,
}

impl DocSetFilter {
    /// Wrap `docs`, described by the text that produced them.
    pub fn new<S: Into<String>>(docs: DocSet, description: S) -> Self {
        DocSetFilter {
            docs,
            description: description.into(),
        }
    }
}

impl Filter for DocSetFilter {
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet> {
        Ok(self.docs.intersect(&reader.live_docs()))
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Accepts documents whose main query score lies in a range.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRangeFilter {
    lower: Option<f32>,
    upper: Option<f32>,
    include_lower: bool,
    include_upper: bool,
}

impl ScoreRangeFilter {
    /// Create a range with inclusive bounds; `None` leaves a side open.
    pub fn new(lower: Option<f32>, upper: Option<f32>) -> Self {
        ScoreRangeFilter {
            lower,
            upper,
            include_lower: true,
            include_upper: true,
        }
    }

    /// Set bound inclusivity.
    pub fn with_inclusive(mut self, include_lower: bool, include_upper: bool) -> Self {
        self.include_lower = include_lower;
        self.include_upper = include_upper;
        self
    }
}

impl Filter for ScoreRangeFilter {
    fn doc_set(&self, reader: &dyn SegmentReader) -> Result<DocSet> {
        Ok(reader.live_docs())
    }

    fn requires_scores(&self) -> bool {
        true
    }

    fn accepts_score(&self, score: f32) -> bool {
        let above = match self.lower {
            Some(lower) if self.include_lower => score >= lower,
            Some(lower) => score > lower,
            None => true,
        };
        let below = match self.upper {
            Some(upper) if self.include_upper => score <= upper,
            Some(upper) => score < upper,
            None => true,
        };
        above && below
    }

    fn description(&self) -> String {
        let open = if self.include_lower { '[' } else { '{' };
        let close = if self.include_upper { ']' } else { '}' };
        let bound = |b: Option<f32>| b.map_or("*".to_string(), |v| v.to_string());
        format!("score:{open}{} TO {}{close}", bound(self.lower), bound(self.upper))
    }
}
