//! Per-document vector sources.
//!
//! A [`VectorValueSource`] describes where the vector for a document comes
//! from: a constant supplied by the query, or a dense vector field. Binding a
//! source to one segment yields [`VectorValues`], the per-segment accessor.
//! Field-backed accessors wrap a forward-only [`FieldCursor`], so documents
//! must be requested in non-decreasing order.

use std::fmt;

use crate::error::{Result, VecQueryError};
use crate::index::reader::{SegmentReader, VectorIterator};
use crate::vector::core::vector::VectorLiteral;

/// Where the vector of a document comes from.
#[derive(Debug, Clone)]
pub enum VectorValueSource {
    /// The same vector for every document.
    Const {
        /// The literal as written in the query.
        literal: VectorLiteral,
        /// The literal widened to floats.
        values: Vec<f32>,
    },
    /// The value stored in a dense vector field.
    Field {
        /// Field name.
        field: String,
        /// Declared dimension of the field.
        dimension: usize,
    },
}

impl VectorValueSource {
    /// Create a constant source.
    pub fn constant(literal: VectorLiteral) -> Self {
        let values = literal.as_f32().into_owned();
        VectorValueSource::Const { literal, values }
    }

    /// Create a field-backed source.
    pub fn field<S: Into<String>>(field: S, dimension: usize) -> Self {
        VectorValueSource::Field {
            field: field.into(),
            dimension,
        }
    }

    /// Dimension of the vectors this source produces.
    pub fn dimension(&self) -> usize {
        match self {
            VectorValueSource::Const { values, .. } => values.len(),
            VectorValueSource::Field { dimension, .. } => *dimension,
        }
    }

    /// Human readable description, used in query explanations.
    pub fn description(&self) -> String {
        match self {
            VectorValueSource::Const { literal, .. } => format!("const({literal})"),
            VectorValueSource::Field { field, .. } => format!("denseVector({field})"),
        }
    }

    /// Bind this source to one segment.
    pub fn values<'a>(&'a self, reader: &'a dyn SegmentReader) -> Result<VectorValues<'a>> {
        match self {
            VectorValueSource::Const { values, .. } => Ok(VectorValues::Const(values)),
            VectorValueSource::Field { field, dimension } => {
                let iter = reader.vector_values(field)?;
                Ok(VectorValues::Field(FieldCursor::new(iter, *dimension)))
            }
        }
    }
}

impl PartialEq for VectorValueSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                VectorValueSource::Const { values: a, .. },
                VectorValueSource::Const { values: b, .. },
            ) => a == b,
            (
                VectorValueSource::Field { field: a, .. },
                VectorValueSource::Field { field: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for VectorValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Vector accessor bound to one segment.
pub enum VectorValues<'a> {
    /// Constant vector, valid for every document.
    Const(&'a [f32]),
    /// Field cursor over the segment.
    Field(FieldCursor<'a>),
}

impl<'a> VectorValues<'a> {
    /// Whether `doc` has a vector.
    pub fn exists(&mut self, doc: u32) -> Result<bool> {
        match self {
            VectorValues::Const(_) => Ok(true),
            VectorValues::Field(cursor) => cursor.exists(doc),
        }
    }

    /// The vector of `doc`.
    pub fn vector_val(&mut self, doc: u32) -> Result<&[f32]> {
        match self {
            VectorValues::Const(values) => Ok(*values),
            VectorValues::Field(cursor) => cursor.vector_val(doc),
        }
    }
}

/// Forward-only cursor over the vectors of one field in one segment.
///
/// Documents without a value read as the all-zero vector of the field's
/// dimension, allocated on first use.
pub struct FieldCursor<'a> {
    iter: Option<Box<dyn VectorIterator + 'a>>,
    dimension: usize,
    last_doc: Option<u32>,
    default: Option<Vec<f32>>,
}

impl<'a> FieldCursor<'a> {
    /// Wrap a segment iterator. `None` means no document has a value.
    pub fn new(iter: Option<Box<dyn VectorIterator + 'a>>, dimension: usize) -> Self {
        FieldCursor {
            iter,
            dimension,
            last_doc: None,
            default: None,
        }
    }

    /// Move to `doc` and report whether it has a value.
    pub fn exists(&mut self, doc: u32) -> Result<bool> {
        if let Some(last_doc) = self.last_doc {
            if doc < last_doc {
                return Err(VecQueryError::out_of_order(last_doc, doc));
            }
        }
        self.last_doc = Some(doc);

        let Some(iter) = self.iter.as_mut() else {
            return Ok(false);
        };

        let current = match iter.doc_id() {
            Some(current) if current >= doc => current,
            _ => iter.advance(doc)?,
        };
        Ok(current == doc)
    }

    /// The vector of `doc`, or the zero vector when it has none.
    pub fn vector_val(&mut self, doc: u32) -> Result<&[f32]> {
        if self.exists(doc)? {
            if let Some(iter) = self.iter.as_ref() {
                return Ok(iter.vector_value());
            }
        }

        let dimension = self.dimension;
        Ok(self.default.get_or_insert_with(|| vec![0.0; dimension]))
    }
}

impl fmt::Debug for FieldCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCursor")
            .field("dimension", &self.dimension)
            .field("last_doc", &self.last_doc)
            .finish()
    }
}
