//! Cinegraph CLI: command-line interface for the movie graph and recommender
//!
//! Loads a dataset file into an in-memory graph, then trains, recommends or
//! runs projection analytics against it.

use anyhow::{Context, Result};
use cinegraph::algo::{LouvainConfig, PageRankConfig, SimilarityConfig};
use cinegraph::catalog::Catalog;
use cinegraph::projection::{EntityScore, ProjectionSpec};
use cinegraph::{Analytics, Config, Dataset, GraphStore, InProcessAlgorithms, Pipeline, ProjectionManager};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cinegraph", version, about = "Cinegraph movie graph CLI")]
struct Cli {
    /// Dataset file (YAML, or JSON by extension)
    #[arg(long, default_value = "data/sample_movies.yaml", global = true, env = "CINEGRAPH_DATA")]
    data: PathBuf,

    /// Configuration file (YAML)
    #[arg(long, global = true, env = "CINEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, clap::ValueEnum)]
enum Centrality {
    Degree,
    Betweenness,
    Pagerank,
}

#[derive(Subcommand)]
enum Commands {
    /// Train every configured model and save the artifact bundle
    Train,
    /// Recommend unrated movies for a user
    Recommend {
        user: String,

        /// Only this model (default: every model in the bundle)
        #[arg(long)]
        model: Option<String>,

        /// Number of movies per model (default: from config)
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Show the evaluation metrics of the saved bundle
    Metrics,
    /// Show catalog statistics
    Stats,
    /// Show label and relationship type counts
    Labels,
    /// Nodes with the most outgoing relationships
    Top {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search persons and movies by name or title
    Search {
        term: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Rank entities of the configured projection
    Centrality {
        #[arg(long, default_value = "degree")]
        algorithm: Centrality,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Louvain communities of the configured projection
    Communities,
    /// Most similar entity pairs of the configured projection
    Similarity {
        /// Neighbours kept per entity
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let store = load_graph(&cli.data, &config)?;

    match &cli.command {
        Commands::Train => run_train(&store, &config, &cli.format),
        Commands::Recommend { user, model, top_n } => {
            run_recommend(&store, &config, user, model.as_deref(), *top_n, &cli.format)
        }
        Commands::Metrics => run_metrics(&config, &cli.format),
        Commands::Stats => run_stats(&store, &cli.format),
        Commands::Labels => run_labels(&store, &cli.format),
        Commands::Top { limit } => run_top(&store, *limit, &cli.format),
        Commands::Search { term, limit } => run_search(&store, term, *limit, &cli.format),
        Commands::Centrality { algorithm, limit } => run_centrality(&store, &config, algorithm, *limit, &cli.format),
        Commands::Communities => run_communities(&store, &config, &cli.format),
        Commands::Similarity { top_k, limit } => run_similarity(&store, &config, *top_k, *limit, &cli.format),
    }
}

fn load_graph(path: &Path, config: &Config) -> Result<GraphStore> {
    let dataset = Dataset::from_file(path).with_context(|| format!("loading {}", path.display()))?;
    let mut store = GraphStore::new();
    dataset.apply(&mut Catalog::new(&mut store, config.rating))?;
    debug!("Loaded {} nodes and {} edges", store.node_count(), store.edge_count());
    Ok(store)
}

/// Render rows in the requested format; `json` is used as-is for JSON output
fn emit(format: &OutputFormat, columns: &[&str], rows: Vec<Vec<String>>, json: Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Csv => {
            println!("{}", columns.join(","));
            for row in &rows {
                let cells: Vec<String> = row.iter().map(|v| format_csv_value(v)).collect();
                println!("{}", cells.join(","));
            }
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(columns);
            let count = rows.len();
            for row in rows {
                table.add_row(row);
            }

            println!("{}", table);
            println!("{} row(s)", count);
        }
    }
    Ok(())
}

fn run_train(store: &GraphStore, config: &Config, format: &OutputFormat) -> Result<()> {
    let bundle = Pipeline::new(config.clone()).train_and_save(store)?;
    eprintln!(
        "Saved bundle '{}' (run {}) with {} users and {} movies",
        bundle.manifest.bundle,
        bundle.manifest.run_id,
        bundle.users.len(),
        bundle.items.len()
    );
    print_metrics(&bundle.metrics, format)
}

fn run_metrics(config: &Config, format: &OutputFormat) -> Result<()> {
    let metrics = Pipeline::new(config.clone())
        .store()
        .load_metrics(&config.artifacts.bundle)?;
    print_metrics(&metrics, format)
}

fn print_metrics(metrics: &[cinegraph::ModelMetrics], format: &OutputFormat) -> Result<()> {
    let rows = metrics
        .iter()
        .map(|m| {
            vec![
                m.model.clone(),
                format!("{:.4}", m.mse),
                format!("{:.4}", m.mae),
                m.r2.map_or_else(String::new, |r| format!("{:.4}", r)),
            ]
        })
        .collect();
    emit(format, &["Model", "MSE", "MAE", "R2"], rows, serde_json::to_value(metrics)?)
}

fn run_recommend(
    store: &GraphStore,
    config: &Config,
    user: &str,
    model: Option<&str>,
    top_n: Option<usize>,
    format: &OutputFormat,
) -> Result<()> {
    let pipeline = Pipeline::new(config.clone());
    let bundle = pipeline.load_or_train(store)?;
    let recommender = cinegraph::Recommender::new(store, &bundle);
    let top_n = top_n.unwrap_or(config.recommend.top_n);

    let lists = match model {
        Some(name) => vec![cinegraph::recommend::ModelRecommendations {
            model: name.to_string(),
            items: recommender.recommend(user, name, top_n)?,
        }],
        None => recommender.recommend_all(user, top_n)?,
    };

    let rows = lists
        .iter()
        .flat_map(|list| {
            list.items.iter().enumerate().map(move |(rank, rec)| {
                vec![
                    list.model.clone(),
                    (rank + 1).to_string(),
                    rec.item.clone(),
                    format!("{:.3}", rec.score),
                ]
            })
        })
        .collect();
    emit(format, &["Model", "Rank", "Movie", "Score"], rows, serde_json::to_value(&lists)?)
}

fn run_stats(store: &GraphStore, format: &OutputFormat) -> Result<()> {
    let stats = Analytics::new(store).statistics()?;
    let rows = vec![
        vec!["Movies".to_string(), stats.movies.to_string()],
        vec!["Persons".to_string(), stats.persons.to_string()],
        vec!["Users".to_string(), stats.users.to_string()],
        vec!["Genres".to_string(), stats.genres.to_string()],
        vec!["Ratings".to_string(), stats.ratings.to_string()],
        vec![
            "Average rating".to_string(),
            stats.average_rating.map_or_else(String::new, |a| format!("{:.2}", a)),
        ],
        vec!["Relationships".to_string(), stats.relationships.to_string()],
    ];
    emit(format, &["Metric", "Value"], rows, serde_json::to_value(&stats)?)
}

fn run_labels(store: &GraphStore, format: &OutputFormat) -> Result<()> {
    let analytics = Analytics::new(store);
    let labels = analytics.label_distribution()?;
    let types = analytics.relationship_distribution()?;

    let rows = labels
        .iter()
        .map(|c| vec!["label".to_string(), c.name.clone(), c.count.to_string()])
        .chain(
            types
                .iter()
                .map(|c| vec!["relationship".to_string(), c.name.clone(), c.count.to_string()]),
        )
        .collect();
    emit(
        format,
        &["Kind", "Name", "Count"],
        rows,
        json!({ "labels": labels, "relationships": types }),
    )
}

fn run_top(store: &GraphStore, limit: usize, format: &OutputFormat) -> Result<()> {
    let top = Analytics::new(store).top_connected(limit)?;
    let rows = top
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.label.clone(),
                d.outgoing.to_string(),
                d.incoming.to_string(),
            ]
        })
        .collect();
    emit(format, &["Name", "Label", "Outgoing", "Incoming"], rows, serde_json::to_value(&top)?)
}

fn run_search(store: &GraphStore, term: &str, limit: usize, format: &OutputFormat) -> Result<()> {
    let hits = Analytics::new(store).search(term, limit)?;
    let rows = hits.iter().map(|h| vec![h.label.clone(), h.name.clone()]).collect();
    emit(format, &["Label", "Name"], rows, serde_json::to_value(&hits)?)
}

fn projected(store: &GraphStore, config: &Config) -> Result<(ProjectionManager<InProcessAlgorithms>, String)> {
    let mut manager = ProjectionManager::new(InProcessAlgorithms::new());
    let spec = ProjectionSpec::from(&config.projection);
    manager.create(store, &spec)?;
    Ok((manager, spec.name))
}

fn run_centrality(
    store: &GraphStore,
    config: &Config,
    algorithm: &Centrality,
    limit: usize,
    format: &OutputFormat,
) -> Result<()> {
    let (manager, name) = projected(store, config)?;
    let mut scores: Vec<EntityScore> = match algorithm {
        Centrality::Degree => manager.degree_centrality(&name)?,
        Centrality::Betweenness => manager.betweenness_centrality(&name)?,
        Centrality::Pagerank => manager.page_rank(&name, PageRankConfig::default())?,
    };
    scores.truncate(limit);

    let rows = scores
        .iter()
        .map(|s| vec![s.entity.clone(), s.label.clone(), format!("{:.4}", s.score)])
        .collect();
    emit(format, &["Entity", "Label", "Score"], rows, serde_json::to_value(&scores)?)
}

fn run_communities(store: &GraphStore, config: &Config, format: &OutputFormat) -> Result<()> {
    let (manager, name) = projected(store, config)?;
    let result = manager.louvain(&name, LouvainConfig::default())?;
    eprintln!(
        "{} communities, modularity {:.4}",
        result.community_count, result.modularity
    );

    let rows = result
        .assignments
        .iter()
        .map(|a| vec![a.community.to_string(), a.entity.clone(), a.label.clone()])
        .collect();
    emit(format, &["Community", "Entity", "Label"], rows, serde_json::to_value(&result)?)
}

fn run_similarity(store: &GraphStore, config: &Config, top_k: usize, limit: usize, format: &OutputFormat) -> Result<()> {
    let (manager, name) = projected(store, config)?;
    let mut pairs = manager.node_similarity(
        &name,
        SimilarityConfig {
            top_k,
            ..Default::default()
        },
    )?;
    pairs.truncate(limit);

    let rows = pairs
        .iter()
        .map(|p| vec![p.first.clone(), p.second.clone(), format!("{:.4}", p.similarity)])
        .collect();
    emit(format, &["First", "Second", "Similarity"], rows, serde_json::to_value(&pairs)?)
}

fn format_csv_value(v: &str) -> String {
    if v.contains(',') || v.contains('"') || v.contains('\n') {
        format!("\"{}\"", v.replace('"', "\"\""))
    } else {
        v.to_string()
    }
}
