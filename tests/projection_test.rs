use cinegraph::algo::{LouvainConfig, PageRankConfig, SimilarityConfig};
use cinegraph::catalog::{Catalog, Role};
use cinegraph::config::RatingScale;
use cinegraph::projection::{Orientation, ProjectionSpec};
use cinegraph::{Config, GraphStore, InProcessAlgorithms, ProjectionError, ProjectionManager};

fn movie_graph() -> GraphStore {
    let mut store = GraphStore::new();
    let mut catalog = Catalog::new(&mut store, RatingScale::default());
    catalog.add_movie("Alien", Some(1979), &["Horror".into(), "Sci-Fi".into()]).unwrap();
    catalog.add_movie("Aliens", Some(1986), &["Action".into(), "Sci-Fi".into()]).unwrap();
    catalog.add_movie("Titanic", Some(1997), &["Drama".into(), "Romance".into()]).unwrap();
    catalog.add_person("Sigourney Weaver", Some(74), Some("female"), &[Role::Actor]).unwrap();
    catalog.add_person("James Cameron", Some(69), Some("male"), &[Role::Director, Role::Writer]).unwrap();
    catalog.link_person_to_movie("Sigourney Weaver", "Alien", &[Role::Actor]).unwrap();
    catalog.link_person_to_movie("Sigourney Weaver", "Aliens", &[Role::Actor]).unwrap();
    catalog.link_person_to_movie("James Cameron", "Aliens", &[Role::Director, Role::Writer]).unwrap();
    catalog.link_person_to_movie("James Cameron", "Titanic", &[Role::Director, Role::Writer]).unwrap();
    catalog.rate_movie("ann", "Alien", 9.0).unwrap();
    catalog.rate_movie("ann", "Aliens", 8.0).unwrap();
    catalog.rate_movie("bob", "Titanic", 7.0).unwrap();
    store
}

fn manager() -> ProjectionManager<InProcessAlgorithms> {
    ProjectionManager::new(InProcessAlgorithms::new())
}

fn full_spec() -> ProjectionSpec {
    ProjectionSpec::from(&Config::default().projection)
}

#[test]
fn test_drop_of_absent_projection_succeeds() {
    let mut manager = manager();
    assert!(!manager.drop("never-created").unwrap());
    assert!(!manager.exists("never-created"));
}

#[test]
fn test_create_twice_fails_then_drop_and_recreate() {
    let store = movie_graph();
    let mut manager = manager();
    let spec = full_spec();

    manager.create(&store, &spec).unwrap();
    assert_eq!(
        manager.create(&store, &spec),
        Err(ProjectionError::AlreadyExists(spec.name.clone()))
    );
    assert_eq!(manager.list().len(), 1);

    assert!(manager.drop(&spec.name).unwrap());
    assert!(!manager.exists(&spec.name));
    assert!(manager.create(&store, &spec).is_ok());
}

#[test]
fn test_create_or_replace_picks_up_graph_changes() {
    let mut store = movie_graph();
    let mut manager = manager();
    let spec = full_spec();

    let before = manager.create_or_replace(&store, &spec).unwrap();
    Catalog::new(&mut store, RatingScale::default())
        .rate_movie("bob", "Alien", 6.0)
        .unwrap();
    let after = manager.create_or_replace(&store, &spec).unwrap();

    assert_eq!(after.node_count, before.node_count);
    assert_eq!(after.relationship_count, before.relationship_count + 1);
    assert_eq!(manager.list().len(), 1);
}

#[test]
fn test_algorithms_on_absent_projection_fail() {
    let store = movie_graph();
    let mut manager = manager();
    let not_found = Err(ProjectionError::NotFound("missing".to_string()));

    assert_eq!(manager.degree_centrality("missing"), not_found);
    assert_eq!(manager.betweenness_centrality("missing"), not_found);
    assert_eq!(manager.page_rank("missing", PageRankConfig::default()), not_found);
    assert!(matches!(
        manager.louvain("missing", LouvainConfig::default()),
        Err(ProjectionError::NotFound(_))
    ));
    assert!(matches!(
        manager.node_similarity("missing", SimilarityConfig::default()),
        Err(ProjectionError::NotFound(_))
    ));

    // Dropped projections are absent again
    manager.create(&store, &full_spec()).unwrap();
    manager.drop(&full_spec().name).unwrap();
    assert!(matches!(
        manager.degree_centrality(&full_spec().name),
        Err(ProjectionError::NotFound(_))
    ));
}

#[test]
fn test_invalid_spec_is_rejected_before_projecting() {
    let store = movie_graph();
    let mut manager = manager();
    let err = manager.create(&store, &ProjectionSpec::new("empty")).unwrap_err();
    assert!(matches!(err, ProjectionError::InvalidSpec(_)));
    assert!(!manager.exists("empty"));
}

#[test]
fn test_centrality_over_full_graph() {
    let store = movie_graph();
    let mut manager = manager();
    let spec = full_spec();
    let info = manager.create(&store, &spec).unwrap();

    // 3 movies, 5 genres, 2 persons, 2 users
    assert_eq!(info.node_count, 12);
    // 6 IN_GENRE, 6 credits, 3 RATED
    assert_eq!(info.relationship_count, 15);

    let degree = manager.degree_centrality(&spec.name).unwrap();
    assert_eq!(degree.len(), 12);
    assert_eq!(degree[0].entity, "James Cameron");
    assert_eq!(degree[0].score, 4.0);

    let ranks = manager.page_rank(&spec.name, PageRankConfig::default()).unwrap();
    assert_eq!(ranks[0].entity, "Sci-Fi");
    assert_eq!(ranks[0].label, "Genre");

    let betweenness = manager.betweenness_centrality(&spec.name).unwrap();
    assert!(betweenness.iter().all(|s| s.score >= 0.0));
    // Sinks lie on no shortest path between other nodes
    let horror = betweenness.iter().find(|s| s.entity == "Horror").unwrap();
    assert_eq!(horror.score, 0.0);
}

#[test]
fn test_communities_and_similarity_use_entity_names() {
    let store = movie_graph();
    let mut manager = manager();
    let spec = ProjectionSpec::new("undirected")
        .with_labels(["Movie", "Genre", "Person"])
        .with_relationship_types(["IN_GENRE", "ACTOR", "DIRECTOR", "WRITER"])
        .with_orientation(Orientation::Undirected);
    manager.create(&store, &spec).unwrap();

    let communities = manager.louvain("undirected", LouvainConfig::default()).unwrap();
    assert_eq!(communities.assignments.len(), 10);
    let community_of = |name: &str| {
        communities
            .assignments
            .iter()
            .find(|a| a.entity == name)
            .map(|a| a.community)
            .unwrap()
    };
    assert_eq!(community_of("Titanic"), community_of("Romance"));

    let directed = ProjectionSpec::new("credits")
        .with_labels(["Movie", "Genre"])
        .with_relationship_types(["IN_GENRE"]);
    manager.create(&store, &directed).unwrap();
    let pairs = manager.node_similarity("credits", SimilarityConfig::default()).unwrap();
    let alien_pair = pairs
        .iter()
        .find(|p| {
            let mut names = [p.first.as_str(), p.second.as_str()];
            names.sort();
            names == ["Alien", "Aliens"]
        })
        .unwrap();
    // {Horror, Sci-Fi} vs {Action, Sci-Fi}
    assert!((alien_pair.similarity - 1.0 / 3.0).abs() < 1e-12);
    assert!(pairs.iter().all(|p| p.first != "Titanic" && p.second != "Titanic"));
}
