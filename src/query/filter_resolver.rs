//! Pre-filter / post-filter resolution for KNN clauses.
//!
//! A KNN clause searches a domain of documents. Which of the request's filter
//! directives narrow that domain (pre-filters) and which are only applied to
//! the final result (post-filters) depends on the clause's own local
//! parameters and on where the clause sits in the query:
//!
//! 1. `preFilter` given: its filters are the pre-filters, intersected. An
//!    empty value means no pre-filtering. Every request directive stays a
//!    post-filter.
//! 2. `includeTags` and/or `excludeTags` given: the directives tagged with an
//!    included tag (every directive when `includeTags` is absent), minus those
//!    tagged with an excluded tag, are the pre-filters.
//! 3. Neither given: a top-level clause, or a clause used as a filter,
//!    pre-filters with every directive; a sub-query or rerank clause does not
//!    pre-filter at all.
//!
//! Directives that depend on the main query score are never pre-filters.
//! Whatever is not a pre-filter remains a post-filter, so the resolver only
//! decides when a directive applies, never whether it does.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, VecQueryError};
use crate::query::filter::{Filter, FilterDirective};
use crate::query::filter_parser::{FilterParser, split_list};
use crate::query::knn::ExecutionContext;
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;

/// Local parameter listing explicit pre-filters.
pub const PRE_FILTER_PARAM: &str = "preFilter";

/// Local parameter selecting directives by tag.
pub const INCLUDE_TAGS_PARAM: &str = "includeTags";

/// Local parameter deselecting directives by tag.
pub const EXCLUDE_TAGS_PARAM: &str = "excludeTags";

/// The filter-related local parameters of a KNN clause.
///
/// `None` means the parameter was not given; `Some` with an empty list means
/// it was given without any usable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnnFilterParams {
    /// Explicit pre-filter texts.
    pub pre_filter: Option<Vec<String>>,
    /// Tags whose directives may pre-filter.
    pub include_tags: Option<Vec<String>>,
    /// Tags whose directives may not pre-filter.
    pub exclude_tags: Option<Vec<String>>,
}

impl KnnFilterParams {
    /// Read the filter parameters of a KNN clause.
    pub fn from_local_params(local: &LocalParams) -> Self {
        KnnFilterParams {
            pre_filter: local
                .contains(PRE_FILTER_PARAM)
                .then(|| local.get_all(PRE_FILTER_PARAM).to_vec()),
            include_tags: local
                .contains(INCLUDE_TAGS_PARAM)
                .then(|| split_list(local.get_all(INCLUDE_TAGS_PARAM))),
            exclude_tags: local
                .contains(EXCLUDE_TAGS_PARAM)
                .then(|| split_list(local.get_all(EXCLUDE_TAGS_PARAM))),
        }
    }

    /// Set explicit pre-filters.
    pub fn with_pre_filter<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_filter = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    /// Set the included tags.
    pub fn with_include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Set the excluded tags.
    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Whether tag-based selection was requested.
    pub fn has_tags(&self) -> bool {
        self.include_tags.is_some() || self.exclude_tags.is_some()
    }
}

/// Outcome of filter resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFilters {
    /// Filters narrowing the search domain; intersected.
    pub pre_filters: Vec<Arc<dyn Filter>>,
    /// Request directives applied after the search.
    pub post_filters: Vec<FilterDirective>,
}

impl ResolvedFilters {
    /// Descriptions of the pre-filters, for logging and explanations.
    pub fn pre_filter_descriptions(&self) -> Vec<String> {
        self.pre_filters.iter().map(|f| f.description()).collect()
    }
}

/// Decides the timing of filter directives for one KNN clause.
pub struct FilterResolver<'a> {
    parser: &'a dyn FilterParser,
}

impl<'a> FilterResolver<'a> {
    /// Create a resolver that parses explicit pre-filters with `parser`.
    pub fn new(parser: &'a dyn FilterParser) -> Self {
        FilterResolver { parser }
    }

    /// Split `directives` into pre- and post-filters.
    ///
    /// For a clause used as a filter, `directives` are the request's other
    /// directives; the clause itself is not among them.
    pub fn resolve(
        &self,
        directives: &[FilterDirective],
        params: &KnnFilterParams,
        context: ExecutionContext,
        request: &RequestParams,
    ) -> Result<ResolvedFilters> {
        validate(params, context)?;

        let resolved = match &params.pre_filter {
            Some(texts) => ResolvedFilters {
                pre_filters: self.parse_pre_filters(texts, request)?,
                post_filters: directives.to_vec(),
            },
            None => {
                let selected = |directive: &FilterDirective| {
                    !directive.requires_scores() && selects(directive, params, context)
                };
                let (pre, post): (Vec<&FilterDirective>, Vec<&FilterDirective>) =
                    directives.iter().partition(|directive| selected(*directive));
                ResolvedFilters {
                    pre_filters: pre.into_iter().map(|d| d.filter.clone()).collect(),
                    post_filters: post.into_iter().cloned().collect(),
                }
            }
        };

        debug!(
            ?context,
            pre_filters = resolved.pre_filters.len(),
            post_filters = resolved.post_filters.len(),
            explicit = params.pre_filter.is_some(),
            "resolved knn filters"
        );
        Ok(resolved)
    }

    fn parse_pre_filters(
        &self,
        texts: &[String],
        request: &RequestParams,
    ) -> Result<Vec<Arc<dyn Filter>>> {
        let mut filters = Vec::with_capacity(texts.len());
        for text in texts.iter().filter(|text| !text.trim().is_empty()) {
            let filter = self.parser.parse(text, request)?;
            if filter.requires_scores() {
                return Err(VecQueryError::invalid_parameter(format!(
                    "score dependent filter '{text}' cannot be used as a knn preFilter"
                )));
            }
            filters.push(filter);
        }
        Ok(filters)
    }
}

fn validate(params: &KnnFilterParams, context: ExecutionContext) -> Result<()> {
    if params.pre_filter.is_some() && params.has_tags() {
        return Err(VecQueryError::incompatible_local_params(
            "knn query parser does not support combining preFilter localparam with either includeTags or excludeTags",
        ));
    }

    if params.has_tags() {
        match context {
            ExecutionContext::FilterClause => {
                return Err(VecQueryError::incompatible_local_params(
                    "knn query parser used as a filter does not support includeTags or excludeTags localparams",
                ));
            }
            ExecutionContext::SubQuery => {
                return Err(VecQueryError::incompatible_local_params(
                    "knn query parser used as a sub-query does not support includeTags or excludeTags localparams",
                ));
            }
            ExecutionContext::TopLevel | ExecutionContext::RerankQuery => {}
        }
    }

    Ok(())
}

fn selects(directive: &FilterDirective, params: &KnnFilterParams, context: ExecutionContext) -> bool {
    if params.has_tags() {
        let included = params
            .include_tags
            .as_ref()
            .is_none_or(|tags| directive.has_any_tag(tags));
        let excluded = params
            .exclude_tags
            .as_ref()
            .is_some_and(|tags| directive.has_any_tag(tags));
        return included && !excluded;
    }

    match context {
        ExecutionContext::TopLevel | ExecutionContext::FilterClause => true,
        ExecutionContext::SubQuery | ExecutionContext::RerankQuery => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::{MatchAllFilter, ScoreRangeFilter, TermsFilter};
    use crate::query::filter_parser::StandardFilterParser;

    fn terms(field: &str, values: &[&str]) -> Arc<dyn Filter> {
        Arc::new(TermsFilter::new(
            field,
            values.iter().map(|v| v.to_string()).collect(),
        ))
    }

    fn directives() -> Vec<FilterDirective> {
        vec![
            FilterDirective::tagged(terms("id", &["1", "2"]), ["t1"]),
            FilterDirective::tagged(terms("id", &["2", "3"]), ["t2", "t3"]),
            FilterDirective::new(terms("color", &["red"])),
        ]
    }

    fn resolve(params: &KnnFilterParams, context: ExecutionContext) -> Result<ResolvedFilters> {
        let parser = StandardFilterParser::new()?;
        FilterResolver::new(&parser).resolve(&directives(), params, context, &RequestParams::new())
    }

    fn pre(resolved: &ResolvedFilters) -> Vec<String> {
        resolved.pre_filter_descriptions()
    }

    fn post(resolved: &ResolvedFilters) -> Vec<String> {
        resolved
            .post_filters
            .iter()
            .map(|d| d.filter.description())
            .collect()
    }

    #[test]
    fn test_default_by_context() {
        let params = KnnFilterParams::default();

        let top = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert_eq!(pre(&top), vec!["id:(1 2)", "id:(2 3)", "color:red"]);
        assert!(top.post_filters.is_empty());

        let filter = resolve(&params, ExecutionContext::FilterClause).unwrap();
        assert_eq!(pre(&filter).len(), 3);

        for context in [ExecutionContext::SubQuery, ExecutionContext::RerankQuery] {
            let resolved = resolve(&params, context).unwrap();
            assert!(resolved.pre_filters.is_empty());
            assert_eq!(post(&resolved).len(), 3);
        }
    }

    #[test]
    fn test_explicit_pre_filter() {
        let params = KnnFilterParams::default().with_pre_filter(["id:(1 2 7)", "id:(2 7)"]);
        let resolved = resolve(&params, ExecutionContext::SubQuery).unwrap();
        assert_eq!(pre(&resolved), vec!["id:(1 2 7)", "id:(2 7)"]);
        assert_eq!(post(&resolved).len(), 3);

        let params = KnnFilterParams::default().with_pre_filter([""]);
        let resolved = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert!(resolved.pre_filters.is_empty());
        assert_eq!(post(&resolved).len(), 3);
    }

    #[test]
    fn test_include_and_exclude_tags() {
        let params = KnnFilterParams::default().with_include_tags(["t1", "t3"]);
        let resolved = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert_eq!(pre(&resolved), vec!["id:(1 2)", "id:(2 3)"]);
        assert_eq!(post(&resolved), vec!["color:red"]);

        let params = KnnFilterParams::default().with_exclude_tags(["t2"]);
        let resolved = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert_eq!(pre(&resolved), vec!["id:(1 2)", "color:red"]);

        let params = KnnFilterParams::default()
            .with_include_tags(["t1", "t2"])
            .with_exclude_tags(["t3"]);
        let resolved = resolve(&params, ExecutionContext::RerankQuery).unwrap();
        assert_eq!(pre(&resolved), vec!["id:(1 2)"]);

        let params = KnnFilterParams::default().with_include_tags(Vec::<String>::new());
        let resolved = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert!(resolved.pre_filters.is_empty());

        let params = KnnFilterParams::default().with_include_tags(["unknown"]);
        let resolved = resolve(&params, ExecutionContext::TopLevel).unwrap();
        assert!(resolved.pre_filters.is_empty());
        assert_eq!(resolved.post_filters.len(), 3);
    }

    #[test]
    fn test_incompatible_combinations() {
        let params = KnnFilterParams::default()
            .with_pre_filter(["id:1"])
            .with_include_tags(["t1"]);
        for context in [ExecutionContext::TopLevel, ExecutionContext::SubQuery] {
            let err = resolve(&params, context).unwrap_err();
            assert!(matches!(err, VecQueryError::IncompatibleLocalParams(_)));
            assert_eq!(
                err.to_string(),
                "knn query parser does not support combining preFilter localparam with either includeTags or excludeTags"
            );
        }

        let params = KnnFilterParams::default().with_exclude_tags(["t1"]);
        let err = resolve(&params, ExecutionContext::FilterClause).unwrap_err();
        assert_eq!(
            err.to_string(),
            "knn query parser used as a filter does not support includeTags or excludeTags localparams"
        );

        let err = resolve(&params, ExecutionContext::SubQuery).unwrap_err();
        assert_eq!(
            err.to_string(),
            "knn query parser used as a sub-query does not support includeTags or excludeTags localparams"
        );
    }

    #[test]
    fn test_score_filters_stay_post_filters() {
        let parser = StandardFilterParser::new().unwrap();
        let directives = vec![
            FilterDirective::new(Arc::new(MatchAllFilter)),
            FilterDirective::tagged(Arc::new(ScoreRangeFilter::new(Some(0.5), None)), ["t1"]),
        ];
        let resolver = FilterResolver::new(&parser);

        let resolved = resolver
            .resolve(
                &directives,
                &KnnFilterParams::default(),
                ExecutionContext::TopLevel,
                &RequestParams::new(),
            )
            .unwrap();
        assert_eq!(pre(&resolved), vec!["*:*"]);
        assert_eq!(post(&resolved), vec!["score:[0.5 TO *]"]);

        let err = resolver
            .resolve(
                &directives,
                &KnnFilterParams::default().with_pre_filter(["{!frange l=0.5}"]),
                ExecutionContext::TopLevel,
                &RequestParams::new(),
            )
            .unwrap_err();
        assert!(matches!(err, VecQueryError::InvalidParameterValue(_)));
    }

    #[test]
    fn test_from_local_params() {
        let (local, _) = LocalParams::parse(
            "{!knn f=vector includeTags='t1, t2' excludeTags=t3 preFilter=''}",
            &RequestParams::new(),
        )
        .unwrap();
        let params = KnnFilterParams::from_local_params(&local.unwrap());
        assert_eq!(params.pre_filter, Some(vec![String::new()]));
        assert_eq!(
            params.include_tags,
            Some(vec!["t1".to_string(), "t2".to_string()])
        );
        assert_eq!(params.exclude_tags, Some(vec!["t3".to_string()]));

        let (local, _) = LocalParams::parse("{!knn f=vector}", &RequestParams::new()).unwrap();
        let params = KnnFilterParams::from_local_params(&local.unwrap());
        assert_eq!(params, KnnFilterParams::default());
    }
}
