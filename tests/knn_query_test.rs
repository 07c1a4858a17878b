//! Scenario tests for KNN clauses and their interaction with request filters.
//!
//! Documents 1..=10 hold `vector = [1 + d, 2, 3, 4]` compared with euclidean
//! similarity, so the query `[1, 2, 3, 4]` ranks them by the offset `d`:
//! 1, 4, 2, 10, 3, 7, 5, 6, 9, 8. Documents 11..=13 only hold `vector2`.

use vecquery::error::{Result, VecQueryError};
use vecquery::index::{MemoryDocument, MemoryIndex};
use vecquery::schema::{FieldType, Schema};
use vecquery::search::{Clause, Rerank, SearchExecutor, SearchRequest, SearchResults};
use vecquery::vector::SimilarityFunction;

const QUERY: &str = "[1.0, 2.0, 3.0, 4.0]";

fn corpus() -> Result<MemoryIndex> {
    let schema = Schema::builder()
        .field("id", FieldType::Keyword)
        .field("vector", FieldType::dense_vector(4, SimilarityFunction::Euclidean))
        .field("vector2", FieldType::dense_vector(4, SimilarityFunction::Euclidean))
        .field(
            "vector_byte_encoding",
            FieldType::byte_vector(4, SimilarityFunction::Euclidean),
        )
        .build()?;

    let offsets: [f32; 10] = [0.0, 2.0, 4.0, 1.0, 6.0, 7.0, 5.0, 9.0, 8.0, 3.0];
    let bytes: [[i8; 4]; 10] = [
        [-20, -20, -20, -20],
        [2, 2, 1, 3],
        [2, 2, 1, 4],
        [8, 3, 2, 5],
        [30, 30, 30, 30],
        [-30, -30, -30, -30],
        [40, 40, 40, 40],
        [8, 3, 2, 4],
        [-40, -40, -40, -40],
        [50, 50, 50, 50],
    ];

    let mut builder = MemoryIndex::builder(schema);
    for (i, (offset, bytes)) in offsets.iter().zip(bytes).enumerate() {
        builder = builder.document(
            MemoryDocument::new((i + 1).to_string())
                .vector("vector", vec![1.0 + offset, 2.0, 3.0, 4.0])
                .vector("vector_byte_encoding", bytes.to_vec()),
        );
    }
    for (id, offset) in [("11", 0.0f32), ("12", 2.0), ("13", 1.0)] {
        builder = builder
            .document(MemoryDocument::new(id).vector("vector2", vec![1.0 + offset, 2.0, 3.0, 4.0]));
    }
    builder.build()
}

fn run(request: SearchRequest) -> Result<SearchResults> {
    let index = corpus()?;
    SearchExecutor::for_index(&index)?.search(&request)
}

fn ids(request: SearchRequest) -> Result<Vec<String>> {
    Ok(run(request)?
        .ids()
        .into_iter()
        .map(str::to_string)
        .collect())
}

fn knn(text: &str) -> SearchRequest {
    SearchRequest::new(Clause::knn(text))
}

fn error(request: SearchRequest) -> VecQueryError {
    match run(request) {
        Ok(results) => panic!("expected an error, got {:?}", results.ids()),
        Err(err) => err,
    }
}

#[test]
fn test_incorrect_top_k_is_rejected() -> Result<()> {
    for top_k in ["string", "4.5", "0"] {
        let err = error(knn(&format!("{{!knn f=vector topK={top_k}}}{QUERY}")));
        assert!(matches!(err, VecQueryError::InvalidParameterValue(_)));
        assert!(err.is_client_error());
    }
    Ok(())
}

#[test]
fn test_missing_top_k_returns_default() -> Result<()> {
    assert_eq!(
        ids(knn(&format!("{{!knn f=vector}}{QUERY}")))?,
        vec!["1", "4", "2", "10", "3", "7", "5", "6", "9", "8"]
    );
    Ok(())
}

#[test]
fn test_top_k_limits_results() -> Result<()> {
    assert_eq!(
        ids(knn(&format!("{{!knn f=vector topK=5}}{QUERY}")))?,
        vec!["1", "4", "2", "10", "3"]
    );
    assert_eq!(
        ids(knn(&format!("{{!knn f=vector topK=3}}{QUERY}")))?,
        vec!["1", "4", "2"]
    );
    Ok(())
}

#[test]
fn test_scores_follow_euclidean_similarity() -> Result<()> {
    let results = run(knn(&format!("{{!knn f=vector topK=3}}{QUERY}")))?;
    assert_eq!(results.scores(), vec![1.0, 0.5, 0.2]);
    assert_eq!(results.max_score, 1.0);
    Ok(())
}

#[test]
fn test_field_errors() -> Result<()> {
    let err = error(knn(&format!("{{!knn f=id topK=10}}{QUERY}")));
    assert!(matches!(err, VecQueryError::UnsupportedFieldType(_)));
    assert_eq!(
        err.to_string(),
        "only dense vector fields are compatible with the knn query parser, field 'id' is of type KeywordField"
    );

    let err = error(knn(&format!("{{!knn f=notExistent topK=10}}{QUERY}")));
    assert_eq!(err.to_string(), "undefined field: \"notExistent\"");

    let err = error(knn(&format!("{{!knn topK=10}}{QUERY}")));
    assert!(matches!(err, VecQueryError::MissingRequiredParameter(_)));
    assert_eq!(err.to_string(), "the vector field 'f' is missing");
    Ok(())
}

#[test]
fn test_search_uses_the_named_field() -> Result<()> {
    assert_eq!(
        ids(knn(&format!("{{!knn f=vector2 topK=5}}{QUERY}")))?,
        vec!["11", "13", "12"]
    );
    Ok(())
}

#[test]
fn test_high_dimension_fields() -> Result<()> {
    let schema = Schema::builder()
        .field("id", FieldType::Keyword)
        .field(
            "2048_float_vector",
            FieldType::dense_vector(2048, SimilarityFunction::Cosine),
        )
        .field(
            "2048_byte_vector",
            FieldType::byte_vector(2048, SimilarityFunction::Cosine),
        )
        .build()?;

    let floats = |seed: usize| -> Vec<f32> { (0..2048).map(|i| ((i * seed) % 7) as f32).collect() };
    let bytes = |seed: usize| -> Vec<i8> { (0..2048).map(|i| ((i * seed) % 11) as i8).collect() };
    let index = MemoryIndex::builder(schema)
        .document(
            MemoryDocument::new("1")
                .vector("2048_float_vector", floats(3))
                .vector("2048_byte_vector", bytes(3)),
        )
        .document(
            MemoryDocument::new("2")
                .vector("2048_float_vector", floats(5))
                .vector("2048_byte_vector", bytes(5)),
        )
        .build()?;
    let executor = SearchExecutor::for_index(&index)?;

    let literal = |values: Vec<String>| format!("[{}]", values.join(","));
    let float_query = literal(floats(3).iter().map(|v| v.to_string()).collect());
    let byte_query = literal(bytes(3).iter().map(|v| v.to_string()).collect());

    let results = executor.search(&knn(&format!(
        "{{!knn f=2048_float_vector topK=1}}{float_query}"
    )))?;
    assert_eq!(results.ids(), vec!["1"]);

    let results = executor.search(&knn(&format!(
        "{{!knn f=2048_byte_vector topK=1}}{byte_query}"
    )))?;
    assert_eq!(results.ids(), vec!["1"]);
    Ok(())
}

#[test]
fn test_byte_encoded_field() -> Result<()> {
    assert_eq!(
        ids(knn("{!knn f=vector_byte_encoding topK=2}[2, 2, 1, 3]"))?,
        vec!["2", "3"]
    );
    assert_eq!(
        ids(knn("{!knn f=vector_byte_encoding topK=2}[8, 3, 2, 4]"))?,
        vec!["8", "4"]
    );
    Ok(())
}

#[test]
fn test_byte_encoded_field_rejects_bad_elements() -> Result<()> {
    const SUFFIX: &str =
        ". The expected format is:'[b1,b2..b3]' where each element b is a byte (-128 to 127)";

    for (vector, token) in [
        ("[8.3, 4.3, 2.1, 4.1]", "8.3"),
        ("[1, -129, 3, 5]", " -129"),
        ("[1, 3, 156, 5]", " 156"),
    ] {
        let err = error(knn(&format!(
            "{{!knn f=vector_byte_encoding topK=10}}{vector}"
        )));
        assert!(matches!(err, VecQueryError::MalformedVectorElement(_)));
        assert_eq!(
            err.to_string(),
            format!("incorrect vector element: '{token}'{SUFFIX}")
        );
    }
    Ok(())
}

#[test]
fn test_missing_vector_is_rejected() -> Result<()> {
    let err = error(knn("{!knn f=vector topK=10}"));
    assert_eq!(err.to_string(), "the vector value 'v' to search is missing");
    Ok(())
}

#[test]
fn test_vector_dimension_is_checked() -> Result<()> {
    let err = error(knn("{!knn f=vector topK=10}[2.0, 4.4, 3.]"));
    assert!(matches!(err, VecQueryError::VectorDimensionMismatch(_)));
    assert_eq!(
        err.to_string(),
        "incorrect vector dimension. The vector value has size 3 while it is expected a vector with size 4"
    );

    let err = error(knn("{!knn f=vector topK=10}[2.0, 4.4,,]"));
    assert_eq!(
        err.to_string(),
        "incorrect vector dimension. The vector value has size 2 while it is expected a vector with size 4"
    );
    Ok(())
}

#[test]
fn test_malformed_vectors_are_rejected() -> Result<()> {
    const FORMAT: &str =
        "incorrect vector format. The expected format is:'[f1,f2..f3]' where each element f is a float";
    const SUFFIX: &str = ". The expected format is:'[f1,f2..f3]' where each element f is a float";

    for vector in [
        "2.0, 4.4, 3.5, 6.4",
        "[2.0, 4.4, 3.5, 6.4",
        "2.0, 4.4, 3.5, 6.4]",
    ] {
        let err = error(knn(&format!("{{!knn f=vector topK=10}}{vector}")));
        assert!(matches!(err, VecQueryError::MalformedVectorFormat(_)));
        assert_eq!(err.to_string(), FORMAT);
    }

    let err = error(knn("{!knn f=vector topK=10}[2.0, 4.4, 3.5, stringElement]"));
    assert_eq!(
        err.to_string(),
        format!("incorrect vector element: ' stringElement'{SUFFIX}")
    );

    let err = error(knn("{!knn f=vector topK=10}[2.0, 4.4, , ]"));
    assert_eq!(err.to_string(), format!("incorrect vector element: ' '{SUFFIX}"));
    Ok(())
}

#[test]
fn test_knn_filter_restricts_the_main_query() -> Result<()> {
    // topK=4 -> 1, 4, 2, 10
    let request = SearchRequest::new(Clause::filter("id:(3 4 9 2)"))
        .filter(format!("{{!knn f=vector topK=4}}{QUERY}"));
    assert_eq!(ids(request)?, vec!["2", "4"]);

    // the other filter does not narrow the knn filter's domain
    let request = SearchRequest::new(Clause::filter("id:(3 4 9 2)"))
        .filter(format!("{{!knn f=vector topK=4}}{QUERY}"))
        .filter("id:(4 20 9)");
    assert_eq!(ids(request)?, vec!["4"]);

    // topK=4 with preFilter -> 1, 4, 7, 9
    let request = SearchRequest::new(Clause::filter("id:(3 4 9 2)"))
        .filter(format!(
            "{{!knn f=vector topK=4 preFilter='id:(1 4 7 8 9)'}}{QUERY}"
        ))
        .filter("id:(4 20 9)");
    assert_eq!(ids(request)?, vec!["4", "9"]);
    Ok(())
}

#[test]
fn test_knn_filter_rejects_tags() -> Result<()> {
    for local in ["includeTags=xxx", "excludeTags=xxx"] {
        let request = SearchRequest::new(Clause::filter("*:*"))
            .filter(format!("{{!knn f=vector topK=5 {local}}}{QUERY}"));
        let err = error(request);
        assert!(matches!(err, VecQueryError::IncompatibleLocalParams(_)));
        assert!(err.to_string().contains("used as a filter does not support"));
    }
    Ok(())
}

#[test]
fn test_knn_filter_pre_filters_a_top_level_knn_query() -> Result<()> {
    // fq: preFilter 3, 5, 6, 7, 8, 9 -> topK=5 -> 3, 7, 5, 6, 9
    let fq = format!("{{!knn tag=k f=vector topK=5 preFilter='id:(3 5 6 7 8 9)'}}{QUERY}");

    for local in ["", "includeTags=k"] {
        let request = knn(&format!("{{!knn f=vector {local} topK=3}}{QUERY}")).filter(&fq);
        assert_eq!(ids(request)?, vec!["3", "7", "5"], "local params: {local}");
    }

    // excluded from pre-filtering, the knn filter still applies afterwards
    let request = knn(&format!("{{!knn f=vector excludeTags=k topK=10}}{QUERY}")).filter(&fq);
    assert_eq!(ids(request)?, vec!["3", "7", "5", "6", "9"]);

    // topK=3 over everything -> 1, 4, 2 -> none pass the knn filter
    let request = knn(&format!("{{!knn f=vector excludeTags=k topK=3}}{QUERY}")).filter(&fq);
    assert!(ids(request)?.is_empty());
    Ok(())
}

#[test]
fn test_knn_sub_query_ignores_global_filters() -> Result<()> {
    let knn = Clause::knn("{!knn f=vector topK=5 v=$vec}");

    // topK -> 1, 4, 2, 10, 3 -> fq -> 4, 2, 3
    let request = SearchRequest::new(Clause::all(vec![Clause::filter("*:*"), knn.clone()]))
        .param("vec", QUERY)
        .filter("id:(2 4 7 9 8 20 3)");
    assert_eq!(ids(request)?, vec!["4", "2", "3"]);

    // topK -> 1, 4, 2, 10, 3 plus 8 -> fq -> 4, 2, 3, 8
    let request = SearchRequest::new(Clause::any(vec![
        Clause::constant_score("id:8", 0.01),
        knn,
    ]))
    .param("vec", QUERY)
    .filter("id:(2 4 7 9 8 20 3)");
    assert_eq!(ids(request)?, vec!["4", "2", "3", "8"]);
    Ok(())
}

#[test]
fn test_knn_sub_query_with_pre_filter() -> Result<()> {
    let knn = Clause::knn("{!knn f=vector topK=5 preFilter='id:(2 4 7 9 8 20 3)' v=$vec}");

    let request =
        SearchRequest::new(Clause::all(vec![Clause::filter("*:*"), knn.clone()])).param("vec", QUERY);
    assert_eq!(ids(request)?, vec!["4", "2", "3", "7", "9"]);

    // preFilter -> topK -> 4, 2, 3, 7, 9 -> fq -> 3, 9
    let request = SearchRequest::new(Clause::all(vec![Clause::filter("*:*"), knn.clone()]))
        .param("vec", QUERY)
        .filter("id:(1 9 20 3 5 6 8)");
    assert_eq!(ids(request)?, vec!["3", "9"]);

    // preFilter -> topK -> 4, 2, 3, 7, 9 plus 8 -> fq -> 8, 3, 9
    let request = SearchRequest::new(Clause::any(vec![
        Clause::constant_score("id:8", 100.0),
        knn,
    ]))
    .param("vec", QUERY)
    .filter("id:(1 9 20 3 5 6 8)");
    assert_eq!(ids(request)?, vec!["8", "3", "9"]);
    Ok(())
}

#[test]
fn test_knn_sub_query_rejects_tags() -> Result<()> {
    for local in ["includeTags=xxx", "excludeTags=xxx"] {
        let knn = Clause::knn(format!("{{!knn f=vector topK=5 {local} v=$vec}}"));
        let request = SearchRequest::new(Clause::any(vec![Clause::filter("*:*"), knn]))
            .param("vec", QUERY);
        let err = error(request);
        assert!(matches!(err, VecQueryError::IncompatibleLocalParams(_)));
        assert!(err.to_string().contains("used as a sub-query does not support"));
    }
    Ok(())
}

#[test]
fn test_single_pre_filter_equivalence() -> Result<()> {
    let filter = "id:(1 2 7 20)";
    let requests = [
        knn(&format!("{{!knn f=vector topK=10}}{QUERY}")).filter(filter),
        knn(&format!("{{!knn f=vector preFilter=\"{filter}\" topK=10}}{QUERY}")),
        knn(&format!("{{!knn f=vector preFilter=$my_filt topK=10}}{QUERY}"))
            .param("my_filt", filter),
    ];
    for request in requests {
        assert_eq!(ids(request)?, vec!["1", "2", "7"]);
    }
    Ok(())
}

#[test]
fn test_multi_pre_filter_equivalence() -> Result<()> {
    // 1 and 10 drop out of the intersection
    let fx = "id:(3 4 9 2 1 )";
    let fy = "id:(3 4 9 2 10)";
    let requests = [
        knn(&format!("{{!knn f=vector topK=4}}{QUERY}"))
            .filter(fx)
            .filter(fy),
        knn(&format!(
            "{{!knn f=vector preFilter=\"{fx}\" preFilter=\"{fy}\" topK=4}}{QUERY}"
        )),
        knn(&format!("{{!knn f=vector preFilter=$fx preFilter=$fy topK=4}}{QUERY}"))
            .param("fx", fx)
            .param("fy", fy),
        knn(&format!("{{!knn f=vector preFilter=$multi_filt topK=4}}{QUERY}"))
            .param("multi_filt", fx)
            .param("multi_filt", fy),
    ];
    for request in requests {
        assert_eq!(ids(request)?, vec!["4", "2", "3", "9"]);
    }
    Ok(())
}

#[test]
fn test_pre_filter_with_tags_is_rejected() -> Result<()> {
    for local in ["includeTags=xxx", "excludeTags=xxx"] {
        let err = error(knn(&format!(
            "{{!knn f=vector preFilter='id:1' {local}}}{QUERY}"
        )));
        assert!(matches!(err, VecQueryError::IncompatibleLocalParams(_)));
        assert!(
            err.to_string()
                .contains("does not support combining preFilter localparam with either")
        );
    }
    Ok(())
}

#[test]
fn test_pre_filter_overrides_global_filters() -> Result<()> {
    // an empty preFilter disables pre-filtering
    let request = knn(&format!("{{!knn f=vector preFilter='' topK=5}}{QUERY}")).filter("-id:4");
    assert_eq!(ids(request)?, vec!["1", "2", "10", "3"]);

    // global filters still apply afterwards
    let request = knn(&format!(
        "{{!knn f=vector preFilter='id:(3 4 9 2 7 8)' topK=5}}{QUERY}"
    ))
    .filter("-id:4");
    assert_eq!(ids(request)?, vec!["2", "3", "7", "9"]);
    Ok(())
}

fn tagged(text: &str) -> SearchRequest {
    knn(text)
        .filter("{!tag=xx,aa}id:(5 6 7 8 9 10)")
        .filter("{!tag=yy,aa}id:(1 2 3 4 5 6 7)")
}

#[test]
fn test_include_tags_pre_filter_everything() -> Result<()> {
    // only 7, 5 and 6 pass both filters
    for local in [
        "",
        "includeTags=aa",
        "includeTags=aa excludeTags=''",
        "includeTags=aa excludeTags=bogus",
        "includeTags=xx includeTags=yy",
        "includeTags=xx,yy,bogus",
    ] {
        let request = tagged(&format!("{{!knn f=vector {local} topK=5}}{QUERY}"));
        assert_eq!(ids(request)?, vec!["7", "5", "6"], "local params: {local}");
    }
    Ok(())
}

#[test]
fn test_tags_can_disable_all_pre_filtering() -> Result<()> {
    // topK=6 -> 1, 4, 2, 10, 3, 7; only 7 passes both filters
    for local in [
        "preFilter=''",
        "includeTags=''",
        "includeTags=bogus",
        "excludeTags=aa",
        "includeTags=aa excludeTags=aa",
        "includeTags=aa excludeTags=xx,yy",
        "includeTags=xx,yy excludeTags=aa",
        "excludeTags=xx,yy",
        "excludeTags=xx excludeTags=yy",
        "excludeTags=xx excludeTags=yy,bogus",
        "excludeTags=xx,yy,bogus",
    ] {
        let request = tagged(&format!("{{!knn f=vector {local} topK=6}}{QUERY}"));
        assert_eq!(ids(request)?, vec!["7"], "local params: {local}");
    }
    Ok(())
}

#[test]
fn test_combined_include_exclude_tags() -> Result<()> {
    // only the yy filter pre-filters: topK=5 -> 1, 4, 2, 3, 7; xx keeps 7
    for local in [
        "includeTags=yy,bogus",
        "includeTags=yy excludeTags=''",
        "excludeTags=xx,bogus",
        "includeTags=yy excludeTags=xx",
        "includeTags=aa excludeTags=xx",
    ] {
        let request = tagged(&format!("{{!knn f=vector {local} topK=5}}{QUERY}"));
        assert_eq!(ids(request)?, vec!["7"], "local params: {local}");
    }
    Ok(())
}

#[test]
fn test_exclude_tags_for_multi_select_drill_down() -> Result<()> {
    let base = || {
        SearchRequest::new(Clause::knn(
            "{!knn f=vector topK=5 excludeTags=facet_click v=$vec}",
        ))
        .param("vec", QUERY)
        .filter("-id:(2 3)")
    };

    assert_eq!(ids(base())?, vec!["1", "4", "10", "7", "5"]);
    assert_eq!(
        ids(base().filter("{!tag=facet_click}id:(4)"))?,
        vec!["4"]
    );
    assert_eq!(
        ids(base().filter("{!tag=facet_click}id:(4 5)"))?,
        vec!["4", "5"]
    );
    Ok(())
}

#[test]
fn test_score_filter_is_applied_after_search() -> Result<()> {
    let request =
        knn(&format!("{{!knn f=vector topK=10}}{QUERY}")).filter("{!frange cache=false l=0.15}$q");
    assert_eq!(ids(request)?, vec!["1", "4", "2"]);

    let request = knn(&format!("{{!knn f=vector topK=4}}{QUERY}"))
        .filter("id:(3 4 9 2)")
        .filter("{!frange cache=false l=0.15}$q");
    assert_eq!(ids(request)?, vec!["4", "2"]);
    Ok(())
}

#[test]
fn test_negative_filter_pre_filters() -> Result<()> {
    let request = knn(&format!("{{!knn f=vector topK=4}}{QUERY}")).filter("-id:4");
    assert_eq!(ids(request)?, vec!["1", "2", "10", "3"]);
    Ok(())
}

#[test]
fn test_knn_rerank_adds_similarity_score() -> Result<()> {
    let rerank = Rerank::parse(
        "{!rerank reRankQuery=$rqq reRankDocs=4 reRankWeight=1}",
        &vecquery::query::RequestParams::new()
            .with("rqq", format!("{{!knn f=vector topK=4}}{QUERY}")),
    )?;
    let request = SearchRequest::new(Clause::filter("id:(3 4 9 2)")).rerank(rerank);

    let results = run(request)?;
    assert_eq!(results.ids(), vec!["4", "2", "3", "9"]);
    let expected = [1.5, 1.2, 1.0, 1.0];
    for (score, expected) in results.scores().into_iter().zip(expected) {
        assert!((score - expected).abs() < 1e-6, "{score} != {expected}");
    }
    Ok(())
}
