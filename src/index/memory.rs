//! Single-segment in-memory index.
//!
//! [`MemoryIndex`] stores dense vectors, numeric doc values and keyword terms
//! for a small corpus and implements both [`SegmentReader`] and
//! [`KnnSearcher`]. Nearest-neighbor search is exact: every candidate in the
//! domain is scored with the field's similarity function in score mode.

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{Result, VecQueryError};
use crate::index::doc_set::DocSet;
use crate::index::reader::{NO_MORE_DOCS, SegmentReader, VectorIterator};
use crate::index::searcher::{KnnSearcher, ScoredDoc};
use crate::query::collector::{Collector, TopDocsCollector};
use crate::schema::{FieldType, Schema};
use crate::vector::core::vector::{VectorEncoding, VectorLiteral};

/// Name of the keyword field every document's unique id is indexed under.
pub const ID_FIELD: &str = "id";

/// Candidate count above which KNN scans run on the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 1024;

/// A document to be added to a [`MemoryIndex`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    id: String,
    vectors: Vec<(String, VectorLiteral)>,
    numerics: Vec<(String, f64)>,
    keywords: Vec<(String, String)>,
}

impl MemoryDocument {
    /// Create a document with a unique id.
    pub fn new<S: Into<String>>(id: S) -> Self {
        MemoryDocument {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set a dense vector field.
    pub fn vector<S: Into<String>, V: Into<VectorLiteral>>(mut self, field: S, value: V) -> Self {
        self.vectors.push((field.into(), value.into()));
        self
    }

    /// Set a numeric field.
    pub fn numeric<S: Into<String>>(mut self, field: S, value: f64) -> Self {
        self.numerics.push((field.into(), value));
        self
    }

    /// Add a keyword term.
    pub fn keyword<S: Into<String>, T: Into<String>>(mut self, field: S, term: T) -> Self {
        self.keywords.push((field.into(), term.into()));
        self
    }

    /// The document's unique id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Vectors of one field, in ascending document order.
#[derive(Debug, Default)]
struct VectorColumn {
    docs: Vec<u32>,
    values: Vec<Vec<f32>>,
}

/// An in-memory, single-segment index.
#[derive(Debug)]
pub struct MemoryIndex {
    schema: Schema,
    ids: Vec<String>,
    vectors: AHashMap<String, VectorColumn>,
    numerics: AHashMap<String, AHashMap<u32, f64>>,
    terms: AHashMap<String, AHashMap<String, Vec<u32>>>,
}

impl MemoryIndex {
    /// Create an empty index over `schema`.
    pub fn new(schema: Schema) -> Self {
        MemoryIndex {
            schema,
            ids: Vec::new(),
            vectors: AHashMap::new(),
            numerics: AHashMap::new(),
            terms: AHashMap::new(),
        }
    }

    /// Create a builder.
    pub fn builder(schema: Schema) -> MemoryIndexBuilder {
        MemoryIndexBuilder {
            schema,
            documents: Vec::new(),
        }
    }

    /// The schema of this index.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the index has no documents.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Document id assigned to the document with unique id `id`.
    pub fn doc_id(&self, id: &str) -> Option<u32> {
        self.terms
            .get(ID_FIELD)
            .and_then(|postings| postings.get(id))
            .and_then(|docs| docs.first().copied())
    }

    /// Add a document and return its document id.
    ///
    /// Every field value is validated against the schema before anything is
    /// stored, so a rejected document leaves the index untouched.
    pub fn add_document(&mut self, document: MemoryDocument) -> Result<u32> {
        if document.id.is_empty() {
            return Err(VecQueryError::index("document id cannot be empty"));
        }
        if self.doc_id(&document.id).is_some() {
            return Err(VecQueryError::index(format!(
                "duplicate document id '{}'",
                document.id
            )));
        }

        let mut vectors = Vec::with_capacity(document.vectors.len());
        for (field, literal) in &document.vectors {
            vectors.push((field.as_str(), self.validate_vector(field, literal)?));
        }
        for (field, _) in &document.numerics {
            self.expect_type(field, |t| matches!(t, FieldType::Numeric))?;
        }
        for (field, _) in &document.keywords {
            self.expect_type(field, |t| matches!(t, FieldType::Keyword))?;
        }

        let doc = self.ids.len() as u32;
        for (field, values) in vectors {
            let column = self.vectors.entry(field.to_string()).or_default();
            column.docs.push(doc);
            column.values.push(values);
        }
        for (field, value) in &document.numerics {
            self.numerics
                .entry(field.clone())
                .or_default()
                .insert(doc, *value);
        }
        for (field, term) in &document.keywords {
            self.add_term(field, term, doc);
        }
        self.add_term(ID_FIELD, &document.id, doc);
        self.ids.push(document.id);

        trace!(doc, "added document");
        Ok(doc)
    }

    fn add_term(&mut self, field: &str, term: &str, doc: u32) {
        let postings = self
            .terms
            .entry(field.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default();
        if postings.last() != Some(&doc) {
            postings.push(doc);
        }
    }

    fn validate_vector(&self, field: &str, literal: &VectorLiteral) -> Result<Vec<f32>> {
        let definition = self.schema.field(field)?;
        let Some((dimension, encoding, _)) = definition.vector_params() else {
            return Err(VecQueryError::schema(format!(
                "field '{field}' of type {} cannot hold vectors",
                definition.field_type.type_name()
            )));
        };

        if encoding == VectorEncoding::Byte && literal.encoding() != VectorEncoding::Byte {
            return Err(VecQueryError::schema(format!(
                "field '{field}' stores byte vectors, got {} values",
                literal.encoding().name()
            )));
        }
        literal.validate_dimension(dimension)?;
        if !literal.is_valid() {
            return Err(VecQueryError::malformed_vector_element(
                &literal.to_string(),
                encoding,
            ));
        }

        Ok(literal.as_f32().into_owned())
    }

    fn expect_type(&self, field: &str, accept: impl Fn(&FieldType) -> bool) -> Result<()> {
        let definition = self.schema.field(field)?;
        if !accept(&definition.field_type) {
            return Err(VecQueryError::schema(format!(
                "field '{field}' is of type {}",
                definition.field_type.type_name()
            )));
        }
        Ok(())
    }

    fn numeric_term_docs(&self, field: &str, term: &str) -> Result<DocSet> {
        let target: f64 = term.parse().map_err(|_| {
            VecQueryError::query(format!("invalid number '{term}' for field '{field}'"))
        })?;
        let docs = self
            .numerics
            .get(field)
            .into_iter()
            .flat_map(|values| values.iter())
            .filter(|(_, value)| **value == target)
            .map(|(doc, _)| *doc);
        Ok(DocSet::from_docs(self.max_doc(), docs))
    }
}

impl SegmentReader for MemoryIndex {
    fn max_doc(&self) -> u32 {
        self.ids.len() as u32
    }

    fn vector_values(&self, field: &str) -> Result<Option<Box<dyn VectorIterator + '_>>> {
        Ok(self.vectors.get(field).map(|column| {
            Box::new(ColumnIterator {
                column,
                position: None,
            }) as Box<dyn VectorIterator + '_>
        }))
    }

    fn numeric_value(&self, field: &str, doc: u32) -> Result<Option<f64>> {
        self.expect_type(field, |t| matches!(t, FieldType::Numeric))?;
        Ok(self
            .numerics
            .get(field)
            .and_then(|values| values.get(&doc))
            .copied())
    }

    fn term_docs(&self, field: &str, term: &str) -> Result<DocSet> {
        if field != ID_FIELD {
            let definition = self.schema.field(field)?;
            match definition.field_type {
                FieldType::Keyword => {}
                FieldType::Numeric => return self.numeric_term_docs(field, term),
                FieldType::DenseVector { .. } => {
                    return Err(VecQueryError::query(format!(
                        "field '{field}' of type {} does not support term queries",
                        definition.field_type.type_name()
                    )));
                }
            }
        }

        let docs = self
            .terms
            .get(field)
            .and_then(|postings| postings.get(term))
            .map(|docs| docs.iter().copied())
            .into_iter()
            .flatten();
        Ok(DocSet::from_docs(self.max_doc(), docs))
    }

    fn stored_id(&self, doc: u32) -> Option<String> {
        self.ids.get(doc as usize).cloned()
    }
}

impl KnnSearcher for MemoryIndex {
    fn search(
        &self,
        field: &str,
        query: &VectorLiteral,
        k: usize,
        domain: Option<&DocSet>,
    ) -> Result<Vec<ScoredDoc>> {
        let definition = self.schema.field(field)?;
        let Some((dimension, _, similarity)) = definition.vector_params() else {
            return Err(VecQueryError::unsupported_field_type(
                field,
                definition.field_type.type_name(),
            ));
        };
        query.validate_dimension(dimension)?;

        let Some(column) = self.vectors.get(field) else {
            return Ok(Vec::new());
        };

        let query = query.as_f32();
        let candidates: Vec<usize> = (0..column.docs.len())
            .filter(|&i| domain.is_none_or(|domain| domain.contains(column.docs[i])))
            .collect();

        let score_into = |mut collector: TopDocsCollector, &i: &usize| -> Result<TopDocsCollector> {
            let score = similarity.score(&query, &column.values[i])?;
            collector.collect(column.docs[i], score)?;
            Ok(collector)
        };

        let collector = if candidates.len() < PARALLEL_SCAN_THRESHOLD {
            candidates
                .iter()
                .try_fold(TopDocsCollector::new(k), score_into)?
        } else {
            candidates
                .par_iter()
                .try_fold(|| TopDocsCollector::new(k), score_into)
                .try_reduce(
                    || TopDocsCollector::new(k),
                    |mut left, right| {
                        left.merge(right);
                        Ok(left)
                    },
                )?
        };

        debug!(
            field,
            k,
            candidates = candidates.len(),
            similarity = similarity.name(),
            "knn scan finished"
        );
        Ok(collector.into_sorted_vec())
    }
}

/// Builder for [`MemoryIndex`].
#[derive(Debug)]
pub struct MemoryIndexBuilder {
    schema: Schema,
    documents: Vec<MemoryDocument>,
}

impl MemoryIndexBuilder {
    /// Queue a document. Documents receive ids in the order they are added.
    pub fn document(mut self, document: MemoryDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Queue several documents.
    pub fn documents<I: IntoIterator<Item = MemoryDocument>>(mut self, documents: I) -> Self {
        self.documents.extend(documents);
        self
    }

    /// Build the index, failing on the first invalid document.
    pub fn build(self) -> Result<MemoryIndex> {
        let mut index = MemoryIndex::new(self.schema);
        for document in self.documents {
            index.add_document(document)?;
        }
        debug!(docs = index.len(), "memory index built");
        Ok(index)
    }
}

struct ColumnIterator<'a> {
    column: &'a VectorColumn,
    position: Option<usize>,
}

impl VectorIterator for ColumnIterator<'_> {
    fn doc_id(&self) -> Option<u32> {
        self.position
            .map(|p| self.column.docs.get(p).copied().unwrap_or(NO_MORE_DOCS))
    }

    fn advance(&mut self, target: u32) -> Result<u32> {
        let start = self.position.map_or(0, |p| p + 1);
        let remaining = self.column.docs.get(start..).unwrap_or_default();
        let next = start + remaining.partition_point(|&doc| doc < target);
        self.position = Some(next);
        Ok(self.column.docs.get(next).copied().unwrap_or(NO_MORE_DOCS))
    }

    fn vector_value(&self) -> &[f32] {
        self.position
            .and_then(|p| self.column.values.get(p))
            .map_or(&[][..], |values| values.as_slice())
    }
}
