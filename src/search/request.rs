//! Search requests, clauses and results.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VecQueryError};
use crate::query::knn::KNN_TYPE;
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;

/// Clause type of rerank specifications.
pub const RERANK_TYPE: &str = "rerank";

/// Local parameter holding the rerank query.
pub const RERANK_QUERY_PARAM: &str = "reRankQuery";

/// Local parameter holding the number of hits to rerank.
pub const RERANK_DOCS_PARAM: &str = "reRankDocs";

/// Local parameter holding the rerank score weight.
pub const RERANK_WEIGHT_PARAM: &str = "reRankWeight";

/// Hits reranked when `reRankDocs` is absent.
pub const DEFAULT_RERANK_DOCS: usize = 200;

/// Weight applied when `reRankWeight` is absent.
pub const DEFAULT_RERANK_WEIGHT: f32 = 2.0;

/// Clause type of function queries.
pub const FUNC_TYPE: &str = "func";

/// One node of the main query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// A `{!knn ...}` clause.
    Knn(String),
    /// A function query, with or without a `{!func}` prefix.
    Function(String),
    /// A filter used as a query; every match receives `score`.
    Filter { text: String, score: f32 },
    /// Documents matching every `must` clause; `should` clauses add their
    /// scores. Without `must` clauses a document has to match one `should`.
    Boolean { must: Vec<Clause>, should: Vec<Clause> },
}

impl Clause {
    /// A KNN clause.
    pub fn knn<S: Into<String>>(text: S) -> Self {
        Clause::Knn(text.into())
    }

    /// A function clause.
    pub fn function<S: Into<String>>(text: S) -> Self {
        Clause::Function(text.into())
    }

    /// A filter clause scoring its matches with 1.0.
    pub fn filter<S: Into<String>>(text: S) -> Self {
        Clause::Filter {
            text: text.into(),
            score: 1.0,
        }
    }

    /// A filter clause scoring its matches with `score`.
    pub fn constant_score<S: Into<String>>(text: S, score: f32) -> Self {
        Clause::Filter {
            text: text.into(),
            score,
        }
    }

    /// A conjunction of `clauses`.
    pub fn all(clauses: Vec<Clause>) -> Self {
        Clause::Boolean {
            must: clauses,
            should: Vec::new(),
        }
    }

    /// A disjunction of `clauses`.
    pub fn any(clauses: Vec<Clause>) -> Self {
        Clause::Boolean {
            must: Vec::new(),
            should: clauses,
        }
    }

    /// Classify clause text by its local parameter type.
    ///
    /// `{!knn}` text becomes [`Clause::Knn`], `{!func}` text becomes
    /// [`Clause::Function`] and anything else is a filter clause.
    pub fn parse(text: &str, request: &RequestParams) -> Result<Self> {
        let (local, _) = LocalParams::parse(text, request)?;
        Ok(match local.as_ref().and_then(LocalParams::kind) {
            Some(KNN_TYPE) => Clause::knn(text),
            Some(FUNC_TYPE) => Clause::function(text),
            _ => Clause::filter(text),
        })
    }
}

/// Second pass scoring of the top hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rerank {
    /// Query whose score is added to the top hits.
    pub query: Clause,
    /// Number of top hits rescored.
    pub docs: usize,
    /// Multiplier of the rerank score.
    pub weight: f32,
}

impl Rerank {
    /// Rerank with the default depth and weight.
    pub fn new(query: Clause) -> Self {
        Rerank {
            query,
            docs: DEFAULT_RERANK_DOCS,
            weight: DEFAULT_RERANK_WEIGHT,
        }
    }

    /// Set the number of rescored hits.
    pub fn docs(mut self, docs: usize) -> Self {
        self.docs = docs;
        self
    }

    /// Set the rerank score weight.
    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Parse `{!rerank reRankQuery=$rqq reRankDocs=4 reRankWeight=1}`.
    pub fn parse(text: &str, request: &RequestParams) -> Result<Self> {
        let (local, _) = LocalParams::parse(text, request)?;
        let local = local
            .filter(|local| local.kind() == Some(RERANK_TYPE))
            .ok_or_else(|| {
                VecQueryError::query(format!("expected a {{!rerank}} clause, got '{text}'"))
            })?;

        let query_text = local
            .get(RERANK_QUERY_PARAM)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                VecQueryError::MissingRequiredParameter(format!(
                    "the rerank query '{RERANK_QUERY_PARAM}' is missing"
                ))
            })?;

        let mut rerank = Rerank::new(Clause::parse(query_text, request)?);
        if let Some(raw) = local.get(RERANK_DOCS_PARAM) {
            rerank.docs = raw.trim().parse::<usize>().map_err(|_| {
                VecQueryError::invalid_parameter(format!(
                    "invalid {RERANK_DOCS_PARAM} value: '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = local.get(RERANK_WEIGHT_PARAM) {
            rerank.weight = raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|weight| weight.is_finite())
                .ok_or_else(|| {
                    VecQueryError::invalid_parameter(format!(
                        "invalid {RERANK_WEIGHT_PARAM} value: '{raw}'"
                    ))
                })?;
        }
        Ok(rerank)
    }
}

/// A complete search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// The main query.
    pub query: Clause,
    /// Global filter directives, each optionally `{!tag=..}` prefixed.
    pub filters: Vec<String>,
    /// Request parameters referenced with `$name`.
    pub params: RequestParams,
    /// Optional second pass over the top hits.
    pub rerank: Option<Rerank>,
    /// Maximum number of hits returned; all when `None`.
    pub rows: Option<usize>,
}

impl SearchRequest {
    /// Create a request for `query`.
    pub fn new(query: Clause) -> Self {
        SearchRequest {
            query,
            filters: Vec::new(),
            params: RequestParams::new(),
            rerank: None,
            rows: None,
        }
    }

    /// Add a global filter directive.
    pub fn filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Add a request parameter value.
    pub fn param<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.params.add(name, value);
        self
    }

    /// Set the rerank pass.
    pub fn rerank(mut self, rerank: Rerank) -> Self {
        self.rerank = Some(rerank);
        self
    }

    /// Set the maximum number of returned hits.
    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// One returned document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Stored external id, when the segment has one.
    pub id: Option<String>,
    /// Final score.
    pub score: f32,
}

/// Hits of a request, best first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Returned hits.
    pub hits: Vec<SearchHit>,
    /// Number of matching documents before `rows` was applied.
    pub total_hits: usize,
    /// Best score, 0.0 without hits.
    pub max_score: f32,
}

impl SearchResults {
    /// External ids of the hits, in rank order. Hits without an id are skipped.
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().filter_map(|hit| hit.id.as_deref()).collect()
    }

    /// Scores of the hits, in rank order.
    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|hit| hit.score).collect()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of returned hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }
}
