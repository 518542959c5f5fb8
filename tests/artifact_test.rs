use cinegraph::artifacts::BundleManifest;
use cinegraph::catalog::Catalog;
use cinegraph::config::{ArtifactConfig, RatingScale, TrainingConfig};
use cinegraph::{
    ArtifactBundle, ArtifactError, ArtifactStore, Config, GraphStore, Pipeline, RatingExtractor, Recommender,
    Trainer,
};
use std::fs;
use tempfile::TempDir;

fn rated_graph() -> GraphStore {
    let mut store = GraphStore::new();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());
    for (user, movie, score) in [
        ("ann", "Alien", 9.0),
        ("ann", "Brazil", 4.0),
        ("ann", "Casablanca", 7.0),
        ("ben", "Alien", 6.0),
        ("ben", "Dune", 8.0),
        ("cat", "Brazil", 5.5),
        ("cat", "Dune", 3.0),
        ("cat", "Eraserhead", 2.5),
        ("dan", "Casablanca", 9.5),
        ("dan", "Eraserhead", 6.0),
    ] {
        catalog.rate_movie(user, movie, score).unwrap();
    }
    store
}

fn trained_bundle(store: &GraphStore) -> ArtifactBundle {
    let table = RatingExtractor::new(store).extract().unwrap();
    let run = Trainer::new(TrainingConfig::default()).train(&table).unwrap();
    ArtifactBundle::from_run("movies", run)
}

#[test]
fn test_reloaded_bundle_recommends_identically() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let bundle = trained_bundle(&graph);
    let artifacts = ArtifactStore::new(dir.path());
    artifacts.save(&bundle).unwrap();

    // A later process only has the directory
    let reloaded = ArtifactStore::new(dir.path()).load("movies").unwrap();
    for model in bundle.model_names() {
        let before = Recommender::new(&graph, &bundle).recommend("ben", model, 10).unwrap();
        let after = Recommender::new(&graph, &reloaded).recommend("ben", model, 10).unwrap();
        assert_eq!(before, after);
    }
}

#[test]
fn test_bundle_layout_and_manifest() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let bundle = trained_bundle(&graph);
    let artifacts = ArtifactStore::new(dir.path());
    artifacts.save(&bundle).unwrap();

    let root = artifacts.bundle_dir("movies");
    for file in [
        "manifest.json",
        "user_encoder.bin",
        "item_encoder.bin",
        "metrics.jsonl",
        "models/RandomForest.bin",
        "models/Ridge.bin",
        "models/KNN.bin",
    ] {
        assert!(root.join(file).is_file(), "missing {}", file);
    }

    let manifest: BundleManifest = serde_json::from_slice(&fs::read(root.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest.user_vocab_size, 4);
    assert_eq!(manifest.item_vocab_size, 5);
    assert_eq!(manifest.user_checksum, bundle.users.checksum());
    assert_eq!(manifest.models.len(), 3);

    // No staging directories are left behind
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_missing_model_file_requires_retrain() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let config = Config {
        artifacts: ArtifactConfig {
            dir: dir.path().to_path_buf(),
            bundle: "movies".to_string(),
        },
        ..Default::default()
    };
    let pipeline = Pipeline::new(config);
    let first = pipeline.train_and_save(&graph).unwrap();

    fs::remove_file(pipeline.store().bundle_dir("movies").join("models/Ridge.bin")).unwrap();
    let err = pipeline.store().load("movies").unwrap_err();
    assert!(matches!(err, ArtifactError::Unavailable { .. }));

    let recovered = pipeline.load_or_train(&graph).unwrap();
    assert_ne!(recovered.manifest.run_id, first.manifest.run_id);
    assert!(pipeline.store().load("movies").is_ok());
}

#[test]
fn test_swapped_encoders_are_rejected() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let artifacts = ArtifactStore::new(dir.path());
    artifacts.save(&trained_bundle(&graph)).unwrap();

    let root = artifacts.bundle_dir("movies");
    let users = fs::read(root.join("user_encoder.bin")).unwrap();
    let items = fs::read(root.join("item_encoder.bin")).unwrap();
    fs::write(root.join("user_encoder.bin"), items).unwrap();
    fs::write(root.join("item_encoder.bin"), users).unwrap();

    assert!(matches!(artifacts.load("movies"), Err(ArtifactError::Unavailable { .. })));
}

#[test]
fn test_metrics_round_trip_through_lines() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let bundle = trained_bundle(&graph);
    let artifacts = ArtifactStore::new(dir.path());
    artifacts.save(&bundle).unwrap();

    let metrics = artifacts.load_metrics("movies").unwrap();
    assert_eq!(metrics, bundle.metrics);
    assert!(metrics.iter().all(|m| m.mse >= 0.0 && m.mae >= 0.0));
}

#[test]
fn test_missing_metrics_file_requires_retrain() {
    let dir = TempDir::new().unwrap();
    let graph = rated_graph();
    let config = Config {
        artifacts: ArtifactConfig {
            dir: dir.path().to_path_buf(),
            bundle: "movies".to_string(),
        },
        ..Default::default()
    };
    let pipeline = Pipeline::new(config);
    let first = pipeline.train_and_save(&graph).unwrap();

    fs::remove_file(pipeline.store().bundle_dir("movies").join("metrics.jsonl")).unwrap();
    assert!(matches!(pipeline.store().load("movies"), Err(ArtifactError::Unavailable { .. })));

    let recovered = pipeline.load_or_train(&graph).unwrap();
    assert_ne!(recovered.manifest.run_id, first.manifest.run_id);
    assert_eq!(recovered.metrics.len(), 3);
}
