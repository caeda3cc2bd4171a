// Benchmarks for retrieval, aggregation and scoring
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use remedex_core::{IndexConfig, NeighborMatch, SourceFilter, SymptomIndex, SymptomRecord, Vector};
use remedex_ranking::{
    aggregate, HashingEmbedder, LinearBlend, RankingPipeline, ScoringStrategy, SearchConfig,
    WeightedDiversity,
};
use rand::prelude::*;
use std::sync::Arc;

const DIM: usize = 384;
const ORGANS: [&str; 6] = ["Head", "Eyes", "Chest", "Stomach", "Skin", "Generalities"];
const SOURCES: [&str; 3] = ["clarke", "boericke", "allen"];

fn generate_random_vector(rng: &mut impl Rng, dim: usize) -> Vector {
    let data: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect();
    Vector::new(data)
}

fn generate_records(count: usize, solutions: usize) -> Vec<SymptomRecord> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            SymptomRecord::new(
                format!("solution-{}", i % solutions),
                ORGANS[i % ORGANS.len()],
                SOURCES[i % SOURCES.len()],
                generate_random_vector(&mut rng, DIM),
            )
        })
        .collect()
}

/// A neighbor set shaped like a default search: 150 rows over ~40 solutions.
fn generate_matches() -> Vec<NeighborMatch> {
    let mut rng = rand::rng();
    (0..150)
        .map(|i| {
            NeighborMatch::new(
                format!("solution-{}", rng.random_range(0..40)),
                ORGANS[i % ORGANS.len()],
                SOURCES[i % SOURCES.len()],
                rng.random_range(0.5..0.95),
            )
        })
        .collect()
}

fn benchmark_aggregate_and_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let matches = generate_matches();

    group.bench_function("aggregate", |b| {
        b.iter(|| black_box(aggregate(black_box(&matches))));
    });

    let aggregates = aggregate(&matches);
    let strategies: [(&str, Box<dyn ScoringStrategy>); 2] = [
        ("weighted_diversity", Box::new(WeightedDiversity::default())),
        ("linear_blend", Box::new(LinearBlend::default())),
    ];
    for (name, strategy) in strategies.iter() {
        group.bench_function(BenchmarkId::new("score", name), |b| {
            b.iter(|| {
                for (_, agg) in aggregates.iter() {
                    black_box(strategy.calculate(agg));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");
    group.sample_size(20);

    let mut rng = rand::rng();
    let query = generate_random_vector(&mut rng, DIM);
    let filter = SourceFilter::new(["clarke"]).unwrap();

    for use_hnsw in [false, true] {
        let config = IndexConfig { use_hnsw, ..IndexConfig::default() };
        let index = SymptomIndex::build(config, generate_records(10_000, 500)).unwrap();
        let label = if use_hnsw { "hnsw" } else { "exact" };

        group.bench_function(BenchmarkId::new(label, "unfiltered"), |b| {
            b.iter(|| black_box(index.search(black_box(&query), &SourceFilter::any(), 400, 150).unwrap()));
        });
        group.bench_function(BenchmarkId::new(label, "source_filter"), |b| {
            b.iter(|| black_box(index.search(black_box(&query), &filter, 400, 150).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for size in [1_000usize, 10_000] {
        let index = Arc::new(SymptomIndex::build(IndexConfig::default(), generate_records(size, size / 20)).unwrap());
        let pipeline = RankingPipeline::from_config(
            Arc::new(HashingEmbedder::new(DIM)),
            index,
            SearchConfig::default(),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::new("search", size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    pipeline
                        .search(black_box("throbbing headache worse from light"), &SourceFilter::any())
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_aggregate_and_score, benchmark_index_search, benchmark_pipeline);
criterion_main!(benches);
