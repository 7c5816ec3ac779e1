//! Benchmarks for the search hot paths: slab recycling, pattern cache
//! hits, hybrid search over a small corpus, and semantic scoring.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use lightning_index::cache::memory_pool::SlabPool;
use lightning_index::engine::HybridSearchEngine;
use lightning_index::providers::{InMemoryContentStore, InMemoryTrigramIndex};
use lightning_index::semantic::SemanticScorer;
use lightning_index::types::FileId;

fn bench_slab_pool(c: &mut Criterion) {
    let pool: SlabPool<u32> = SlabPool::with_default_tiers();
    c.bench_function("slab_get_put_64", |b| {
        b.iter(|| {
            let buffer = pool.get(black_box(64));
            pool.put(buffer);
        })
    });
}

fn corpus() -> (InMemoryContentStore, Arc<InMemoryTrigramIndex>, Vec<FileId>) {
    let store = InMemoryContentStore::new();
    let index = Arc::new(InMemoryTrigramIndex::new());
    let mut candidates = Vec::new();
    for i in 1..=50u32 {
        let id = FileId::new(i).expect("non-zero");
        let content = format!(
            "fn handler_{i}() {{ process(\"payload {i}\"); }}\nstruct Config{i} {{ retries: u32 }}\n"
        );
        store.insert(id, content.clone().into_bytes());
        index.insert_file(id, content.as_bytes());
        candidates.push(id);
    }
    (store, index, candidates)
}

fn bench_hybrid_search(c: &mut Criterion) {
    let (store, index, candidates) = corpus();
    let engine = HybridSearchEngine::new().with_trigram_index(index);
    // Warm the pattern cache once.
    engine.search("handler_1", false, &store, &candidates);

    c.bench_function("hybrid_search_cached_simple", |b| {
        b.iter(|| {
            let (matches, _) = engine.search(black_box("handler_1"), false, &store, &candidates);
            black_box(matches)
        })
    });
    c.bench_function("hybrid_search_cold_literal", |b| {
        let mut round = 0u32;
        b.iter(|| {
            round = round.wrapping_add(1);
            let pattern = format!("payload {}", round % 50 + 1);
            let (matches, _) = engine.search(&pattern, false, &store, &candidates);
            black_box(matches)
        })
    });
}

fn bench_semantic_scoring(c: &mut Criterion) {
    let scorer = SemanticScorer::new();
    let candidates: Vec<String> = (0..200)
        .map(|i| format!("requestHandler{i}"))
        .chain(["HTTPClient".to_string(), "authenticate".to_string()])
        .collect();

    c.bench_function("score_many_http_client", |b| {
        b.iter(|| black_box(scorer.score_many(black_box("HTTP client"), &candidates)))
    });
}

criterion_group!(
    benches,
    bench_slab_pool,
    bench_hybrid_search,
    bench_semantic_scoring
);
criterion_main!(benches);
