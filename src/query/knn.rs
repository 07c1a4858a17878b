//! KNN query building and execution.
//!
//! [`KnnQueryBuilder`] turns the parameters of a `{!knn}` clause into a
//! [`KnnRequest`]: it validates the target field, parses the query vector
//! against the field's dimension and element kind, parses `topK`, and resolves
//! which request filters narrow the search domain.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VecQueryError};
use crate::index::reader::SegmentReader;
use crate::index::searcher::{KnnSearcher, ScoredDoc};
use crate::query::filter::{Filter, FilterDirective, intersect_filters};
use crate::query::filter_parser::FilterParser;
use crate::query::filter_resolver::{FilterResolver, KnnFilterParams};
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;
use crate::schema::Schema;
use crate::vector::core::parser::parse_vector_for_field;
use crate::vector::core::vector::VectorLiteral;

/// Clause type of KNN queries.
pub const KNN_TYPE: &str = "knn";

/// Number of neighbors returned when `topK` is absent.
pub const DEFAULT_TOP_K: usize = 10;

/// Local parameter naming the vector field.
pub const FIELD_PARAM: &str = "f";

/// Local parameter carrying the query vector.
pub const VECTOR_PARAM: &str = "v";

/// Local parameter carrying the number of neighbors.
pub const TOP_K_PARAM: &str = "topK";

/// Where a KNN clause sits in the overall query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionContext {
    /// The clause is the whole main query.
    #[default]
    TopLevel,
    /// The clause is a request-level filter.
    FilterClause,
    /// The clause is one operand of a boolean combination.
    SubQuery,
    /// The clause is a rerank query.
    RerankQuery,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionContext::TopLevel => "top-level",
            ExecutionContext::FilterClause => "filter",
            ExecutionContext::SubQuery => "sub-query",
            ExecutionContext::RerankQuery => "rerank",
        };
        f.write_str(name)
    }
}

/// A fully resolved nearest-neighbor request.
#[derive(Debug, Clone)]
pub struct KnnRequest {
    /// Vector field searched.
    pub field: String,
    /// Query vector, already validated against the field.
    pub vector: VectorLiteral,
    /// Maximum number of neighbors.
    pub top_k: usize,
    /// Filters narrowing the search domain; intersected.
    pub pre_filters: Vec<Arc<dyn Filter>>,
    /// Request directives to apply after the search.
    pub post_filters: Vec<FilterDirective>,
    /// Where the clause sits in the query.
    pub context: ExecutionContext,
}

impl KnnRequest {
    /// Run the request against one segment.
    ///
    /// The pre-filters are intersected into the search domain; without
    /// pre-filters the whole segment is searched. Post-filters are left to
    /// the caller.
    pub fn execute(
        &self,
        reader: &dyn SegmentReader,
        searcher: &dyn KnnSearcher,
    ) -> Result<Vec<ScoredDoc>> {
        let domain = intersect_filters(&self.pre_filters, reader)?;

        debug!(
            field = %self.field,
            top_k = self.top_k,
            context = %self.context,
            domain = domain.as_ref().map(|docs| docs.len()),
            "executing knn request"
        );

        searcher.search(&self.field, &self.vector, self.top_k, domain.as_ref())
    }
}

/// Builds [`KnnRequest`]s from clause parameters.
pub struct KnnQueryBuilder<'a> {
    schema: &'a Schema,
    filter_parser: &'a dyn FilterParser,
}

impl<'a> KnnQueryBuilder<'a> {
    /// Create a builder resolving fields against `schema`.
    pub fn new(schema: &'a Schema, filter_parser: &'a dyn FilterParser) -> Self {
        KnnQueryBuilder {
            schema,
            filter_parser,
        }
    }

    /// Build a request from already extracted parameters.
    ///
    /// `directives` are the request-level filters the clause may pre-filter
    /// with; `request` resolves parameter references inside `preFilter`.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        field: Option<&str>,
        vector_text: Option<&str>,
        top_k: Option<&str>,
        filter_params: &KnnFilterParams,
        directives: &[FilterDirective],
        context: ExecutionContext,
        request: &RequestParams,
    ) -> Result<KnnRequest> {
        let field = field
            .filter(|field| !field.trim().is_empty())
            .ok_or_else(VecQueryError::missing_vector_field)?;
        let vector_text = vector_text
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(VecQueryError::missing_vector_value)?;
        let top_k = parse_top_k(top_k)?;

        let definition = self.schema.field(field)?;
        let Some((dimension, encoding, _)) = definition.vector_params() else {
            return Err(VecQueryError::unsupported_field_type(
                field,
                definition.field_type.type_name(),
            ));
        };
        let vector = parse_vector_for_field(vector_text, encoding, dimension)?;

        let resolved = FilterResolver::new(self.filter_parser).resolve(
            directives,
            filter_params,
            context,
            request,
        )?;

        debug!(
            field,
            top_k,
            %context,
            pre_filters = ?resolved.pre_filter_descriptions(),
            "built knn request"
        );

        Ok(KnnRequest {
            field: field.to_string(),
            vector,
            top_k,
            pre_filters: resolved.pre_filters,
            post_filters: resolved.post_filters,
            context,
        })
    }

    /// Build a request from a clause's local parameters and body.
    ///
    /// The query vector is the `v` parameter, or the body when `v` is absent.
    pub fn build_from_local_params(
        &self,
        local: &LocalParams,
        body: &str,
        directives: &[FilterDirective],
        context: ExecutionContext,
        request: &RequestParams,
    ) -> Result<KnnRequest> {
        let vector_text = local.get(VECTOR_PARAM).or(Some(body));
        self.build(
            local.get(FIELD_PARAM),
            vector_text,
            local.get(TOP_K_PARAM),
            &KnnFilterParams::from_local_params(local),
            directives,
            context,
            request,
        )
    }

    /// Parse a `{!knn ...}` clause.
    pub fn parse(
        &self,
        text: &str,
        directives: &[FilterDirective],
        context: ExecutionContext,
        request: &RequestParams,
    ) -> Result<KnnRequest> {
        let (local, body) = LocalParams::parse(text, request)?;
        match local {
            Some(local) if local.kind() == Some(KNN_TYPE) => {
                self.build_from_local_params(&local, body, directives, context, request)
            }
            _ => Err(VecQueryError::query(format!(
                "expected a {{!knn}} clause, got '{text}'"
            ))),
        }
    }
}

fn parse_top_k(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOP_K);
    };

    match raw.trim().parse::<usize>() {
        Ok(top_k) if top_k > 0 => Ok(top_k),
        _ => Err(VecQueryError::invalid_parameter(format!(
            "invalid topK value: '{raw}'. topK must be a positive integer"
        ))),
    }
}
