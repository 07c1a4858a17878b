//! Nearest-neighbor search primitive.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::doc_set::DocSet;
use crate::vector::core::vector::VectorLiteral;

/// A document paired with its similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Similarity score, higher is better.
    pub score: f32,
}

impl ScoredDoc {
    /// Create a new scored document.
    pub fn new(doc_id: u32, score: f32) -> Self {
        ScoredDoc { doc_id, score }
    }
}

/// Bounded nearest-neighbor search over a dense vector field.
pub trait KnnSearcher: Send + Sync {
    /// Return at most `k` documents closest to `query`, ordered by score
    /// descending and then by document id ascending.
    ///
    /// When `domain` is given only its members are eligible.
    fn search(
        &self,
        field: &str,
        query: &VectorLiteral,
        k: usize,
        domain: Option<&DocSet>,
    ) -> Result<Vec<ScoredDoc>>;
}
