//! Cinegraph
//!
//! A movie property graph with a rating-prediction pipeline on top of it and
//! named graph projections for analytics.
//!
//! # Architecture
//!
//! - [`graph`]: in-memory property graph store with a unique key index
//! - [`backend`]: the `GraphBackend` interface every component is handed
//! - [`catalog`]: validated upserts and deletes of persons, movies, genres,
//!   users and ratings, plus YAML/JSON dataset loading
//! - [`ratings`], [`encoder`], [`models`], [`trainer`], [`metrics`]: rating
//!   extraction, identifier encoding, regression models and held-out evaluation
//! - [`artifacts`]: versioned on-disk bundles of encoders, models and metrics
//! - [`recommend`]: top-N unrated items per user
//! - [`projection`], [`algo`]: named projection lifecycle and the in-process
//!   algorithm service
//! - [`analytics`]: counts, degree summaries and text search
//!
//! ## Example Usage
//!
//! ```rust
//! use cinegraph::catalog::Catalog;
//! use cinegraph::config::{RatingScale, TrainingConfig};
//! use cinegraph::{ArtifactBundle, GraphStore, RatingExtractor, Recommender, Trainer};
//!
//! let mut store = GraphStore::new();
//! let mut catalog = Catalog::new(&mut store, RatingScale::default());
//! catalog.rate_movie("u1", "m1", 8.0).unwrap();
//! catalog.rate_movie("u1", "m2", 3.0).unwrap();
//! catalog.rate_movie("u2", "m1", 9.0).unwrap();
//! catalog.rate_movie("u2", "m3", 5.0).unwrap();
//!
//! let table = RatingExtractor::new(&store).extract().unwrap();
//! let run = Trainer::new(TrainingConfig::default()).train(&table).unwrap();
//! let bundle = ArtifactBundle::from_run("demo", run);
//!
//! let recs = Recommender::new(&store, &bundle).recommend("u1", "Ridge", 5).unwrap();
//! assert_eq!(recs.len(), 1);
//! assert_eq!(recs[0].item, "m3");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod analytics;
pub mod artifacts;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod projection;
pub mod ratings;
pub mod recommend;
pub mod schema;
pub mod trainer;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStore, Label, Node, NodeId, NodeKey,
    PropertyMap, PropertyValue,
};

pub use backend::{GraphBackend, ReadQuery, Row, WriteQuery, WriteSummary};

pub use catalog::{Catalog, CatalogError, Dataset, Role};

pub use config::{Config, ConfigError};

pub use ratings::{Rating, RatingExtractor, RatingTable};

pub use encoder::{EncoderError, ItemEncoder, UserEncoder};

pub use models::{ModelSpec, RegressionModel, Regressor};

pub use metrics::ModelMetrics;

pub use trainer::{TrainError, Trainer, TrainingRun};

pub use artifacts::{ArtifactBundle, ArtifactError, ArtifactStore};

pub use recommend::{Recommendation, Recommender};

pub use projection::{AlgorithmService, Orientation, ProjectionError, ProjectionManager, ProjectionSpec};

pub use algo::InProcessAlgorithms;

pub use analytics::Analytics;

pub use pipeline::Pipeline;

pub use error::{CinegraphError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
