use cinegraph::analytics::Analytics;
use cinegraph::catalog::{Catalog, RatingDeletion, Role};
use cinegraph::config::RatingScale;
use cinegraph::{CatalogError, Dataset, GraphStore, RatingExtractor};

fn sample_graph() -> GraphStore {
    let dataset = Dataset::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_movies.yaml")).unwrap();
    let mut store = GraphStore::new();
    dataset.apply(&mut Catalog::new(&mut store, RatingScale::default())).unwrap();
    store
}

#[test]
fn test_sample_dataset_shape() {
    let store = sample_graph();
    let stats = Analytics::new(&store).statistics().unwrap();
    assert_eq!(stats.movies, 8);
    assert_eq!(stats.persons, 8);
    assert_eq!(stats.users, 5);
    assert_eq!(stats.genres, 5);
    assert_eq!(stats.ratings, 20);
}

#[test]
fn test_reapplying_dataset_is_idempotent() {
    let mut store = sample_graph();
    let nodes = store.node_count();
    let edges = store.edge_count();

    let dataset = Dataset::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_movies.yaml")).unwrap();
    dataset.apply(&mut Catalog::new(&mut store, RatingScale::default())).unwrap();
    assert_eq!(store.node_count(), nodes);
    assert_eq!(store.edge_count(), edges);
}

#[test]
fn test_unknown_role_never_reaches_the_graph() {
    let mut store = sample_graph();
    let edges = store.edge_count();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());

    let err = catalog
        .link_person_to_movie_by_name("Keanu Reeves", "Heat", &["actor", "stuntman"])
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnknownRole(_)));
    assert_eq!(store.edge_count(), edges);
}

#[test]
fn test_json_dataset() {
    let json = r#"{
        "movies": [{"title": "Up", "year": 2009, "genres": ["Animation"]}],
        "persons": [{"name": "Pete Docter", "roles": ["Director"], "movies": ["Up"]}],
        "ratings": [{"user": "kim", "movie": "Up", "score": 8.5}]
    }"#;
    let dataset = Dataset::from_json_str(json).unwrap();
    let mut store = GraphStore::new();
    dataset.apply(&mut Catalog::new(&mut store, RatingScale::default())).unwrap();

    let table = RatingExtractor::new(&store).extract().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].item, "Up");
}

#[test]
fn test_detach_delete_removes_ratings() {
    let mut store = sample_graph();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());
    assert!(catalog.delete_movie("Heat").unwrap());
    assert!(!catalog.delete_movie("Heat").unwrap());

    let table = RatingExtractor::new(&store).extract().unwrap();
    assert_eq!(table.len(), 17);
    assert!(table.rows().iter().all(|r| r.item != "Heat"));
}

#[test]
fn test_delete_rating_and_credit() {
    let mut store = sample_graph();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());

    assert_eq!(
        catalog.delete_rating("alice", "Arrival").unwrap(),
        RatingDeletion::Deleted { score: Some(7.5) }
    );
    assert_eq!(catalog.delete_rating("alice", "Arrival").unwrap(), RatingDeletion::NotFound);

    assert!(catalog
        .delete_person_relationship("Christopher Nolan", "Inception", Role::Writer)
        .unwrap());
    assert!(!catalog
        .delete_person_relationship("Christopher Nolan", "Inception", Role::Actor)
        .unwrap());

    assert!(catalog.delete_all().unwrap() > 0);
    assert_eq!(store.node_count(), 0);
}
