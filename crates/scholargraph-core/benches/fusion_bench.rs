//! # Retrieval Benchmarks
//!
//! Rank fusion, record normalization and fulltext scoring.
//!
//! Run with: `cargo bench -p scholargraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scholargraph_core::{
    EntityId, EntityKind, GraphStore, NodeUpsert, NormalizeOptions, RedbGraphStore, SearchConfig,
    fuse, normalize,
};
use serde_json::json;
use std::hint::black_box;

/// Two rankings of `size` ids overlapping by half.
fn rankings(size: usize) -> (Vec<EntityId>, Vec<EntityId>) {
    let vector = (0..size).map(|i| EntityId::new(format!("W{i}"))).collect();
    let fulltext = (size / 2..size + size / 2)
        .rev()
        .map(|i| EntityId::new(format!("W{i}")))
        .collect();
    (vector, fulltext)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_fuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("rrf_fuse");
    let params = SearchConfig::default();

    for size in [20, 200, 2000].iter() {
        let (vector, fulltext) = rankings(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(fuse(&vector, &fulltext, &params)));
        });
    }

    group.finish();
}

fn bench_normalize_work(c: &mut Criterion) {
    let raw = json!({
        "id": "https://openalex.org/W2741809807",
        "doi": "https://doi.org/10.7717/peerj.4375",
        "title": "The state of OA: a large-scale analysis of the prevalence and impact of Open Access articles",
        "publication_year": 2018,
        "cited_by_count": 1200,
        "open_access": { "is_oa": true },
        "authorships": (0..12).map(|i| json!({
            "author": { "id": format!("https://openalex.org/A{i}") },
            "institutions": [{ "id": format!("https://openalex.org/I{}", i % 4) }]
        })).collect::<Vec<_>>(),
        "primary_location": { "source": { "id": "https://openalex.org/S1983995261" } },
        "topics": [{ "id": "https://openalex.org/T10102" }],
        "referenced_works": (0..40).map(|i| format!("https://openalex.org/W{}", 1000 + i)).collect::<Vec<_>>(),
        "abstract_inverted_index": { "Despite": [0], "growing": [1], "interest": [2], "in": [3, 9], "Open": [4], "Access": [5] }
    });

    c.bench_function("normalize_work", |b| {
        b.iter(|| black_box(normalize(EntityKind::Work, &raw, NormalizeOptions::default())));
    });
}

fn bench_fulltext_query(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let temp = tempfile::tempdir().expect("temp dir");
    let store = RedbGraphStore::open(temp.path().join("bench.redb")).expect("open db");

    let words = ["graph", "neural", "citation", "protein", "retrieval", "ocean", "fusion"];
    let batch: Vec<NodeUpsert> = (0..1000)
        .map(|i| {
            let title = format!(
                "{} {} study {i}",
                words[i % words.len()],
                words[(i / 7) % words.len()]
            );
            let raw = json!({ "id": format!("W{i}"), "title": title });
            let work = normalize(EntityKind::Work, &raw, NormalizeOptions::default())
                .expect("normalize")
                .entity;
            NodeUpsert::new(work)
        })
        .collect();
    runtime
        .block_on(store.upsert_nodes(EntityKind::Work, &batch))
        .expect("upsert");

    let mut group = c.benchmark_group("fulltext_query");
    for k in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            b.iter(|| black_box(runtime.block_on(store.fulltext_query("graph citation", k))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fuse, bench_normalize_work, bench_fulltext_query);
criterion_main!(benches);
