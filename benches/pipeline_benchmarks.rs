use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cinegraph::algo::PageRankConfig;
use cinegraph::catalog::Catalog;
use cinegraph::config::{RatingScale, TrainingConfig};
use cinegraph::models::ModelSpec;
use cinegraph::projection::ProjectionSpec;
use cinegraph::{
    ArtifactBundle, GraphStore, InProcessAlgorithms, ProjectionManager, RatingExtractor, Recommender, Trainer,
};

/// Synthetic catalog: every user rates a deterministic slice of the movies
fn rated_graph(users: usize, movies: usize, per_user: usize) -> GraphStore {
    let mut store = GraphStore::new();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());
    for m in 0..movies {
        let genre = format!("Genre{}", m % 7);
        catalog.add_movie(&format!("Movie{}", m), Some(1980 + (m % 40) as i64), &[genre]).unwrap();
    }
    for u in 0..users {
        for k in 0..per_user {
            let m = (u * 13 + k * 7) % movies;
            let score = ((u * 31 + m * 17) % 11) as f64;
            catalog
                .rate_movie(&format!("user{}", u), &format!("Movie{}", m), score)
                .unwrap();
        }
    }
    store
}

/// Benchmark rating extraction from the graph
fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("rating_extraction");

    for users in [50, 500].iter() {
        let store = rated_graph(*users, 200, 20);
        group.bench_with_input(BenchmarkId::from_parameter(users), users, |b, _| {
            b.iter(|| {
                let table = RatingExtractor::new(&store).extract().unwrap();
                criterion::black_box(table.len());
            });
        });
    }
    group.finish();
}

/// Benchmark fitting each model on the same table
fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    let store = rated_graph(200, 300, 20);
    let table = RatingExtractor::new(&store).extract().unwrap();

    for spec in [
        ModelSpec::RandomForest {
            trees: 20,
            max_depth: 8,
            min_samples_split: 2,
        },
        ModelSpec::Ridge { alpha: 1.0 },
        ModelSpec::Knn { k: 5 },
    ] {
        let trainer = Trainer::new(TrainingConfig {
            models: vec![spec.clone()],
            ..Default::default()
        });
        group.bench_function(spec.name(), |b| {
            b.iter(|| {
                let run = trainer.train(&table).unwrap();
                criterion::black_box(run.metrics.len());
            });
        });
    }
    group.finish();
}

/// Benchmark top-N recommendation latency
fn bench_recommendation(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommendation");

    let store = rated_graph(200, 500, 20);
    let table = RatingExtractor::new(&store).extract().unwrap();
    let run = Trainer::new(TrainingConfig {
        models: vec![ModelSpec::Ridge { alpha: 1.0 }, ModelSpec::Knn { k: 5 }],
        ..Default::default()
    })
    .train(&table)
    .unwrap();
    let bundle = ArtifactBundle::from_run("bench", run);

    for model in ["Ridge", "KNN"] {
        group.bench_function(model, |b| {
            let recommender = Recommender::new(&store, &bundle);
            b.iter(|| {
                let recs = recommender.recommend("user42", model, 10).unwrap();
                criterion::black_box(recs.len());
            });
        });
    }
    group.finish();
}

/// Benchmark projecting the catalog and ranking it
fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let store = rated_graph(200, 500, 20);
    let spec = ProjectionSpec::new("bench")
        .with_labels(["Movie", "Genre", "User"])
        .with_relationship_types(["IN_GENRE", "RATED"]);

    group.bench_function("create_and_pagerank", |b| {
        b.iter(|| {
            let mut manager = ProjectionManager::new(InProcessAlgorithms::new());
            manager.create(&store, &spec).unwrap();
            let ranks = manager.page_rank("bench", PageRankConfig::default()).unwrap();
            criterion::black_box(ranks.len());
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_training,
    bench_recommendation,
    bench_projection
);
criterion_main!(benches);
