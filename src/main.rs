use anyhow::Result;
use cinegraph::algo::{LouvainConfig, PageRankConfig};
use cinegraph::catalog::Catalog;
use cinegraph::projection::ProjectionSpec;
use cinegraph::{Analytics, Config, Dataset, GraphStore, InProcessAlgorithms, Pipeline, ProjectionManager};
use tracing_subscriber::EnvFilter;

const SAMPLE_DATASET: &str = include_str!("../data/sample_movies.yaml");

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Cinegraph v{}", cinegraph::version());
    println!("==========================================");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let mut store = GraphStore::new();
    demo_catalog(&mut store, &config)?;
    demo_recommendations(&store, &config)?;
    demo_projections(&store, &config)?;
    Ok(())
}

fn demo_catalog(store: &mut GraphStore, config: &Config) -> Result<()> {
    println!("\n=== Demo 1: Movie Catalog ===");
    let dataset = Dataset::from_yaml_str(SAMPLE_DATASET)?;
    let mut catalog = Catalog::new(store, config.rating);
    dataset.apply(&mut catalog)?;

    let stats = Analytics::new(&*store).statistics()?;
    println!("  Movies: {}", stats.movies);
    println!("  Persons: {}", stats.persons);
    println!("  Users: {}", stats.users);
    println!("  Genres: {}", stats.genres);
    println!("  Relationships: {}", stats.relationships);
    if let Some(avg) = stats.average_rating {
        println!("  Average rating: {:.2} over {} ratings", avg, stats.ratings);
    }
    Ok(())
}

fn demo_recommendations(store: &GraphStore, config: &Config) -> Result<()> {
    println!("\n=== Demo 2: Rating Prediction ===");
    let pipeline = Pipeline::new(config.clone());
    let bundle = pipeline.load_or_train(store)?;

    for m in &bundle.metrics {
        let r2 = m.r2.map_or_else(|| "n/a".to_string(), |r| format!("{:.3}", r));
        println!("  {:<13} MSE {:.3}  MAE {:.3}  R2 {}", m.model, m.mse, m.mae, r2);
    }

    let user = "alice";
    for list in pipeline.recommend(store, &bundle, user)? {
        println!("\n  {} for {}:", list.model, user);
        for rec in list.items.iter().take(3) {
            println!("    {:<20} {:.2}", rec.item, rec.score);
        }
    }
    Ok(())
}

fn demo_projections(store: &GraphStore, config: &Config) -> Result<()> {
    println!("\n=== Demo 3: Graph Projections ===");
    let mut manager = ProjectionManager::new(InProcessAlgorithms::new());
    let spec = ProjectionSpec::from(&config.projection);
    let info = manager.create_or_replace(store, &spec)?;
    println!(
        "  Projected '{}': {} nodes, {} relationships",
        info.name, info.node_count, info.relationship_count
    );

    println!("\n  Most connected (degree):");
    for score in manager.degree_centrality(&spec.name)?.iter().take(5) {
        println!("    {:<20} {:<7} {:.0}", score.entity, score.label, score.score);
    }

    println!("\n  PageRank:");
    for score in manager.page_rank(&spec.name, PageRankConfig::default())?.iter().take(5) {
        println!("    {:<20} {:<7} {:.3}", score.entity, score.label, score.score);
    }

    let communities = manager.louvain(&spec.name, LouvainConfig::default())?;
    println!(
        "\n  Louvain: {} communities, modularity {:.3}",
        communities.community_count, communities.modularity
    );

    manager.drop(&spec.name)?;
    Ok(())
}
