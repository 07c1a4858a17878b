//! Request execution over one segment.
//!
//! The executor plays the part of the surrounding query engine: it parses the
//! global filter directives, derives the execution context of every KNN
//! clause, combines clause scores, applies the global filters to the matched
//! documents and runs the optional rerank pass.

use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::error::{Result, VecQueryError};
use crate::index::doc_set::DocSet;
use crate::index::memory::MemoryIndex;
use crate::index::reader::SegmentReader;
use crate::index::searcher::{KnnSearcher, ScoredDoc};
use crate::query::collector::sort_hits;
use crate::query::filter::{DocSetFilter, Filter, FilterDirective, intersect_filters};
use crate::query::filter_parser::{FilterParser, StandardFilterParser, TAG_PARAM, split_list};
use crate::query::function::FunctionParser;
use crate::query::knn::{ExecutionContext, KNN_TYPE, KnnQueryBuilder};
use crate::query::local_params::LocalParams;
use crate::query::params::RequestParams;
use crate::schema::Schema;
use crate::search::request::{Clause, Rerank, SearchHit, SearchRequest, SearchResults};

/// Executes [`SearchRequest`]s against one segment.
pub struct SearchExecutor<'a> {
    schema: &'a Schema,
    reader: &'a dyn SegmentReader,
    searcher: &'a dyn KnnSearcher,
    filter_parser: Arc<dyn FilterParser>,
}

impl<'a> SearchExecutor<'a> {
    /// Create an executor using the standard filter syntax.
    pub fn new(
        schema: &'a Schema,
        reader: &'a dyn SegmentReader,
        searcher: &'a dyn KnnSearcher,
    ) -> Result<Self> {
        Ok(SearchExecutor {
            schema,
            reader,
            searcher,
            filter_parser: Arc::new(StandardFilterParser::new()?),
        })
    }

    /// Create an executor over an in-memory index.
    pub fn for_index(index: &'a MemoryIndex) -> Result<Self> {
        Self::new(index.schema(), index, index)
    }

    /// Replace the filter parser.
    pub fn with_filter_parser(mut self, filter_parser: Arc<dyn FilterParser>) -> Self {
        self.filter_parser = filter_parser;
        self
    }

    /// Execute `request`.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let filters = self.parse_filters(request)?;

        let matched = self.evaluate(
            &request.query,
            ExecutionContext::TopLevel,
            &filters.directives,
            &request.params,
        )?;
        let matched_count = matched.len();

        let mut hits = filters.apply(matched, self.reader)?;
        sort_hits(&mut hits);

        if let Some(rerank) = &request.rerank {
            hits = self.rerank(hits, rerank, &filters.directives, &request.params)?;
        }

        let total_hits = hits.len();
        if let Some(rows) = request.rows {
            hits.truncate(rows);
        }

        debug!(
            filters = request.filters.len(),
            matched = matched_count,
            total_hits,
            returned = hits.len(),
            reranked = request.rerank.is_some(),
            "executed search request"
        );

        let max_score = hits.first().map_or(0.0, |hit| hit.score);
        let hits = hits
            .into_iter()
            .map(|hit| SearchHit {
                doc_id: hit.doc_id,
                id: self.reader.stored_id(hit.doc_id),
                score: hit.score,
            })
            .collect();

        Ok(SearchResults {
            hits,
            total_hits,
            max_score,
        })
    }

    fn knn_builder(&self) -> KnnQueryBuilder<'_> {
        KnnQueryBuilder::new(self.schema, self.filter_parser.as_ref())
    }

    /// Parse the global filters into directives.
    ///
    /// A KNN filter is resolved against an empty directive pool, so it only
    /// narrows its own domain through an explicit `preFilter`. Its hits become
    /// a document set directive carrying the filter's `tag` values, which the
    /// main clause may then pre-filter with like any other directive.
    fn parse_filters(&self, request: &SearchRequest) -> Result<GlobalFilters> {
        let mut directives = Vec::with_capacity(request.filters.len());

        for text in request.filters.iter().filter(|text| !text.trim().is_empty()) {
            let (local, _) = LocalParams::parse(text, &request.params)?;
            match local {
                Some(local) if local.kind() == Some(KNN_TYPE) => {
                    directives.push(self.knn_directive(text, &local, &request.params)?);
                }
                _ => directives.push(self.filter_parser.parse_directive(text, &request.params)?),
            }
        }

        Ok(GlobalFilters { directives })
    }

    fn knn_directive(
        &self,
        text: &str,
        local: &LocalParams,
        params: &RequestParams,
    ) -> Result<FilterDirective> {
        let knn = self
            .knn_builder()
            .parse(text, &[], ExecutionContext::FilterClause, params)?;
        let hits = knn.execute(self.reader, self.searcher)?;
        let docs = DocSet::from_docs(self.reader.max_doc(), hits.iter().map(|hit| hit.doc_id));

        Ok(FilterDirective::tagged(
            Arc::new(DocSetFilter::new(docs, text)),
            split_list(local.get_all(TAG_PARAM)),
        ))
    }

    fn evaluate(
        &self,
        clause: &Clause,
        context: ExecutionContext,
        directives: &[FilterDirective],
        params: &RequestParams,
    ) -> Result<Vec<ScoredDoc>> {
        match clause {
            Clause::Knn(text) => {
                let knn = self.knn_builder().parse(text, directives, context, params)?;
                knn.execute(self.reader, self.searcher)
            }
            Clause::Function(text) => FunctionParser::new(self.schema)
                .parse(text, params)?
                .score_all(self.reader),
            Clause::Filter { text, score } => {
                let filter = self.filter_parser.parse(text, params)?;
                if filter.requires_scores() {
                    return Err(VecQueryError::query(format!(
                        "score dependent filter '{text}' cannot be used as a query"
                    )));
                }
                Ok(filter
                    .doc_set(self.reader)?
                    .iter()
                    .map(|doc| ScoredDoc::new(doc, *score))
                    .collect())
            }
            Clause::Boolean { must, should } => {
                self.evaluate_boolean(must, should, directives, params)
            }
        }
    }

    fn evaluate_boolean(
        &self,
        must: &[Clause],
        should: &[Clause],
        directives: &[FilterDirective],
        params: &RequestParams,
    ) -> Result<Vec<ScoredDoc>> {
        let mut required: Option<AHashMap<u32, f32>> = None;
        for clause in must {
            let hits = self.evaluate(clause, ExecutionContext::SubQuery, directives, params)?;
            required = Some(match required {
                None => hits.into_iter().map(|hit| (hit.doc_id, hit.score)).collect(),
                Some(scores) => hits
                    .into_iter()
                    .filter_map(|hit| {
                        scores
                            .get(&hit.doc_id)
                            .map(|score| (hit.doc_id, score + hit.score))
                    })
                    .collect(),
            });
        }

        let restricted = required.is_some();
        let mut scores = required.unwrap_or_default();
        for clause in should {
            for hit in self.evaluate(clause, ExecutionContext::SubQuery, directives, params)? {
                if restricted {
                    if let Some(score) = scores.get_mut(&hit.doc_id) {
                        *score += hit.score;
                    }
                } else {
                    *scores.entry(hit.doc_id).or_insert(0.0) += hit.score;
                }
            }
        }

        Ok(scores
            .into_iter()
            .map(|(doc, score)| ScoredDoc::new(doc, score))
            .collect())
    }

    /// Add the weighted rerank score to the top hits and re-sort them.
    ///
    /// `hits` must already be in rank order; hits below the rerank depth keep
    /// their score and position.
    fn rerank(
        &self,
        mut hits: Vec<ScoredDoc>,
        rerank: &Rerank,
        directives: &[FilterDirective],
        params: &RequestParams,
    ) -> Result<Vec<ScoredDoc>> {
        let depth = rerank.docs.min(hits.len());
        if depth == 0 {
            return Ok(hits);
        }

        let rerank_scores: AHashMap<u32, f32> = self
            .evaluate(&rerank.query, ExecutionContext::RerankQuery, directives, params)?
            .into_iter()
            .map(|hit| (hit.doc_id, hit.score))
            .collect();

        let rest = hits.split_off(depth);
        for hit in &mut hits {
            let extra = rerank_scores.get(&hit.doc_id).copied().unwrap_or(0.0);
            hit.score += rerank.weight * extra;
        }
        sort_hits(&mut hits);
        hits.extend(rest);

        debug!(
            depth,
            weight = rerank.weight,
            rerank_matches = rerank_scores.len(),
            "reranked top hits"
        );
        Ok(hits)
    }
}

/// Parsed global filters of one request.
struct GlobalFilters {
    directives: Vec<FilterDirective>,
}

impl GlobalFilters {
    /// Keep the hits every global filter accepts.
    fn apply(&self, hits: Vec<ScoredDoc>, reader: &dyn SegmentReader) -> Result<Vec<ScoredDoc>> {
        let (score_filters, doc_filters): (Vec<&FilterDirective>, Vec<&FilterDirective>) = self
            .directives
            .iter()
            .partition(|directive| directive.requires_scores());

        let doc_filters: Vec<Arc<dyn Filter>> = doc_filters
            .into_iter()
            .map(|directive| directive.filter.clone())
            .collect();
        let allowed = intersect_filters(&doc_filters, reader)?;

        Ok(hits
            .into_iter()
            .filter(|hit| {
                allowed.as_ref().is_none_or(|docs| docs.contains(hit.doc_id))
                    && score_filters
                        .iter()
                        .all(|directive| directive.filter.accepts_score(hit.score))
            })
            .collect())
    }
}
