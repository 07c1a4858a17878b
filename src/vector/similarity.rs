//! Similarity functions for comparing two dense vectors.
//!
//! Every function has two output forms. The raw form is the native value of
//! the function (squared distance, cosine, dot product). The score form maps
//! it onto a positive, higher-is-better scale used for ranking:
//!
//! | function      | raw            | score                 |
//! |---------------|----------------|-----------------------|
//! | `EUCLIDEAN`   | `d = Σ(a-b)²`  | `1 / (1 + d)`         |
//! | `COSINE`      | `cos(a, b)`    | `(1 + cos) / 2`       |
//! | `DOT_PRODUCT` | `a · b`        | `(1 + a · b) / 2`     |

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VecQueryError};
use crate::util::simd::numeric;

/// Number of candidates above which batch scoring runs on the rayon pool.
const PARALLEL_BATCH_THRESHOLD: usize = 100;

/// Similarity functions supported for vector comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimilarityFunction {
    /// Squared euclidean (L2) distance.
    Euclidean,
    /// Cosine of the angle between the vectors.
    #[default]
    Cosine,
    /// Dot product (inner product).
    DotProduct,
}

/// Output form of a similarity evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// The native value of the function.
    #[default]
    Raw,
    /// The bounded, higher-is-better score.
    Score,
}

impl SimilarityFunction {
    /// Get the name of this similarity function.
    pub fn name(&self) -> &'static str {
        match self {
            SimilarityFunction::Euclidean => "EUCLIDEAN",
            SimilarityFunction::Cosine => "COSINE",
            SimilarityFunction::DotProduct => "DOT_PRODUCT",
        }
    }

    /// Parse a similarity function from its name, ignoring case.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "EUCLIDEAN" => Ok(SimilarityFunction::Euclidean),
            "COSINE" => Ok(SimilarityFunction::Cosine),
            "DOT_PRODUCT" => Ok(SimilarityFunction::DotProduct),
            _ => Err(VecQueryError::query(format!(
                "wrong similarity function: {s}"
            ))),
        }
    }

    /// Compute the raw value of this function.
    pub fn compare(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        check_dimensions(a, b)?;

        let result = match self {
            SimilarityFunction::Euclidean => numeric::squared_distance(a, b),
            SimilarityFunction::Cosine => cosine(a, b),
            SimilarityFunction::DotProduct => numeric::dot_product(a, b),
        };

        Ok(result)
    }

    /// Compute the bounded score of this function.
    pub fn score(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        let raw = self.compare(a, b)?;
        Ok(self.to_score(raw))
    }

    /// Compute either form, as selected by `mode`.
    pub fn evaluate(&self, mode: ScoreMode, a: &[f32], b: &[f32]) -> Result<f32> {
        match mode {
            ScoreMode::Raw => self.compare(a, b),
            ScoreMode::Score => self.score(a, b),
        }
    }

    /// Map a raw value of this function to its bounded score.
    pub fn to_score(&self, raw: f32) -> f32 {
        match self {
            SimilarityFunction::Euclidean => 1.0 / (1.0 + raw),
            SimilarityFunction::Cosine => (1.0 + raw) / 2.0,
            SimilarityFunction::DotProduct => (1.0 + raw) / 2.0,
        }
    }

    /// Score a query vector against many candidates.
    ///
    /// Large batches are scored on the rayon pool; the output order matches
    /// the input order.
    pub fn batch_score_parallel(&self, query: &[f32], vectors: &[&[f32]]) -> Result<Vec<f32>> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        if vectors.len() < PARALLEL_BATCH_THRESHOLD {
            return vectors
                .iter()
                .map(|v| self.score(query, v))
                .collect::<Result<Vec<_>>>();
        }

        vectors
            .par_iter()
            .map(|v| self.score(query, v))
            .collect::<Result<Vec<_>>>()
    }
}

impl fmt::Display for SimilarityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarityFunction {
    type Err = VecQueryError;

    fn from_str(s: &str) -> Result<Self> {
        SimilarityFunction::parse_str(s)
    }
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(VecQueryError::vector_dimensions_differ(a.len(), b.len()));
    }
    Ok(())
}

// A zero-norm operand has no direction; it compares as orthogonal.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot = numeric::dot_product(a, b);
    let norm_a = numeric::squared_norm(a);
    let norm_b = numeric::squared_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (f64::from(dot) / (f64::from(norm_a) * f64::from(norm_b)).sqrt()) as f32
}
