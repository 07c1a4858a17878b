use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use vecquery::index::{KnnSearcher, MemoryDocument, MemoryIndex};
use vecquery::schema::{FieldType, Schema};
use vecquery::vector::{SimilarityFunction, VectorLiteral};

fn generate_test_vectors(count: usize, dimension: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|i| {
            (0..dimension)
                .map(|j| ((i as f32 * 0.1 + j as f32 * 0.01).sin() * 0.5 + 0.5) * 2.0 - 1.0)
                .collect()
        })
        .collect()
}

fn bench_similarities(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity_functions");

    for dimension in [4, 128, 768] {
        let vectors = generate_test_vectors(101, dimension);
        let query = &vectors[0];
        let targets = &vectors[1..];

        for similarity in [
            SimilarityFunction::Euclidean,
            SimilarityFunction::Cosine,
            SimilarityFunction::DotProduct,
        ] {
            group.bench_with_input(
                BenchmarkId::new(similarity.name(), dimension),
                &dimension,
                |b, _| {
                    b.iter(|| {
                        for target in targets {
                            let _ = black_box(
                                similarity
                                    .score(black_box(query), black_box(target))
                                    .unwrap(),
                            );
                        }
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_batch_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_score");
    let dimension = 128;

    for count in [50, 1_000, 10_000] {
        let vectors = generate_test_vectors(count + 1, dimension);
        let query = &vectors[0];
        let targets: Vec<&[f32]> = vectors[1..].iter().map(Vec::as_slice).collect();

        group.bench_with_input(BenchmarkId::new("cosine", count), &count, |b, _| {
            b.iter(|| {
                black_box(
                    SimilarityFunction::Cosine
                        .batch_score_parallel(black_box(query), black_box(&targets))
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

fn bench_knn_scan(c: &mut Criterion) {
    let dimension = 128;
    let schema = Schema::builder()
        .field("id", FieldType::Keyword)
        .field(
            "vector",
            FieldType::dense_vector(dimension, SimilarityFunction::Cosine),
        )
        .build()
        .unwrap();

    let mut group = c.benchmark_group("knn_scan");
    for count in [500, 5_000] {
        let vectors = generate_test_vectors(count, dimension);
        let index = MemoryIndex::builder(schema.clone())
            .documents(
                vectors
                    .iter()
                    .enumerate()
                    .map(|(i, v)| MemoryDocument::new(i.to_string()).vector("vector", v.clone())),
            )
            .build()
            .unwrap();
        let query = VectorLiteral::from(vectors[count / 2].clone());

        group.bench_with_input(BenchmarkId::new("top10", count), &count, |b, _| {
            b.iter(|| black_box(index.search("vector", black_box(&query), 10, None).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_similarities, bench_batch_scoring, bench_knn_scan);
criterion_main!(benches);
