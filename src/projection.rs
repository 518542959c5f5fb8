//! Named graph projections and their lifecycle
//!
//! A projection is a named, in-memory snapshot of part of the graph that an
//! algorithm service runs against. [`ProjectionManager`] gates every call:
//!
//! - `create` on a present name fails with `AlreadyExists`
//! - `drop` on an absent name succeeds without doing anything
//! - algorithm calls on an absent name fail with `NotFound`

use crate::backend::GraphBackend;
use crate::config::ProjectionConfig;
use crate::graph::{EdgeType, GraphError, Label};
use cinegraph_algorithms::{LouvainConfig, PageRankConfig, SimilarityConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq)]
pub enum ProjectionError {
    #[error("Projection '{0}' already exists")]
    AlreadyExists(String),

    #[error("Projection '{0}' not found")]
    NotFound(String),

    #[error("Invalid projection: {0}")]
    InvalidSpec(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Direction in which projected relationships are traversed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// As stored
    #[default]
    Natural,
    /// Every relationship flipped
    Reverse,
    /// Every relationship in both directions
    Undirected,
}

/// What to project and under which name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub name: String,
    pub node_labels: Vec<Label>,
    pub relationship_types: Vec<EdgeType>,
    pub orientation: Orientation,
}

impl ProjectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_labels: Vec::new(),
            relationship_types: Vec::new(),
            orientation: Orientation::Natural,
        }
    }

    pub fn with_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.node_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relationship_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EdgeType>,
    {
        self.relationship_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn validate(&self) -> ProjectionResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProjectionError::InvalidSpec("name must not be empty".to_string()));
        }
        if self.node_labels.is_empty() {
            return Err(ProjectionError::InvalidSpec(format!(
                "projection '{}' has no node labels",
                self.name
            )));
        }
        Ok(())
    }
}

impl From<&ProjectionConfig> for ProjectionSpec {
    fn from(config: &ProjectionConfig) -> Self {
        ProjectionSpec::new(config.name.clone())
            .with_labels(config.node_labels.iter().map(String::as_str))
            .with_relationship_types(config.relationship_types.iter().map(String::as_str))
            .with_orientation(config.orientation)
    }
}

/// Size of a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInfo {
    pub name: String,
    pub node_count: usize,
    pub relationship_count: usize,
    pub orientation: Orientation,
}

/// A scored entity of a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScore {
    pub entity: String,
    pub label: String,
    pub score: f64,
}

/// Community membership of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAssignment {
    pub entity: String,
    pub label: String,
    pub community: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityResult {
    pub assignments: Vec<CommunityAssignment>,
    pub community_count: usize,
    pub modularity: f64,
}

/// Unordered pair of similar entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

/// Service that holds named projections and runs algorithms on them.
///
/// Score lists come back ranked, best first.
pub trait AlgorithmService {
    /// Snapshot `spec` from `graph`; fails with `AlreadyExists` if the name is taken
    fn project(&mut self, graph: &dyn GraphBackend, spec: &ProjectionSpec) -> ProjectionResult<ProjectionInfo>;

    /// Discard a projection; fails with `NotFound` if the name is free
    fn drop_projection(&mut self, name: &str) -> ProjectionResult<ProjectionInfo>;

    fn exists(&self, name: &str) -> bool;

    fn list(&self) -> Vec<ProjectionInfo>;

    fn degree_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>>;

    fn betweenness_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>>;

    fn page_rank(&self, name: &str, config: PageRankConfig) -> ProjectionResult<Vec<EntityScore>>;

    fn louvain(&self, name: &str, config: LouvainConfig) -> ProjectionResult<CommunityResult>;

    fn node_similarity(&self, name: &str, config: SimilarityConfig) -> ProjectionResult<Vec<SimilarityScore>>;
}

/// Create/drop state machine over an [`AlgorithmService`]
pub struct ProjectionManager<S: AlgorithmService> {
    service: S,
}

impl<S: AlgorithmService> ProjectionManager<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn exists(&self, name: &str) -> bool {
        self.service.exists(name)
    }

    pub fn list(&self) -> Vec<ProjectionInfo> {
        self.service.list()
    }

    /// ABSENT -> PRESENT
    pub fn create(&mut self, graph: &dyn GraphBackend, spec: &ProjectionSpec) -> ProjectionResult<ProjectionInfo> {
        spec.validate()?;
        if self.service.exists(&spec.name) {
            return Err(ProjectionError::AlreadyExists(spec.name.clone()));
        }
        let info = self.service.project(graph, spec)?;
        info!(
            "Created projection '{}' ({} nodes, {} relationships)",
            info.name, info.node_count, info.relationship_count
        );
        Ok(info)
    }

    /// PRESENT -> ABSENT; returns whether anything was dropped
    pub fn drop(&mut self, name: &str) -> ProjectionResult<bool> {
        if !self.service.exists(name) {
            return Ok(false);
        }
        match self.service.drop_projection(name) {
            Ok(_) => {
                info!("Dropped projection '{}'", name);
                Ok(true)
            }
            Err(ProjectionError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop whatever holds the name, then create it afresh
    pub fn create_or_replace(
        &mut self,
        graph: &dyn GraphBackend,
        spec: &ProjectionSpec,
    ) -> ProjectionResult<ProjectionInfo> {
        spec.validate()?;
        self.drop(&spec.name)?;
        self.create(graph, spec)
    }

    /// Run `f` against a projection that must exist
    pub fn run<T>(&self, name: &str, f: impl FnOnce(&S, &str) -> ProjectionResult<T>) -> ProjectionResult<T> {
        if !self.service.exists(name) {
            return Err(ProjectionError::NotFound(name.to_string()));
        }
        f(&self.service, name)
    }

    pub fn degree_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>> {
        self.run(name, |s, n| s.degree_centrality(n))
    }

    pub fn betweenness_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>> {
        self.run(name, |s, n| s.betweenness_centrality(n))
    }

    pub fn page_rank(&self, name: &str, config: PageRankConfig) -> ProjectionResult<Vec<EntityScore>> {
        self.run(name, |s, n| s.page_rank(n, config))
    }

    pub fn louvain(&self, name: &str, config: LouvainConfig) -> ProjectionResult<CommunityResult> {
        self.run(name, |s, n| s.louvain(n, config))
    }

    pub fn node_similarity(&self, name: &str, config: SimilarityConfig) -> ProjectionResult<Vec<SimilarityScore>> {
        self.run(name, |s, n| s.node_similarity(n, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_config() {
        let spec = ProjectionSpec::from(&ProjectionConfig::default());
        assert_eq!(spec.name, "full-movie-graph");
        assert_eq!(spec.node_labels.len(), 4);
        assert_eq!(spec.relationship_types.len(), 6);
        assert_eq!(spec.orientation, Orientation::Natural);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_spec_validation() {
        assert!(matches!(
            ProjectionSpec::new("g").validate(),
            Err(ProjectionError::InvalidSpec(_))
        ));
        assert!(matches!(
            ProjectionSpec::new(" ").with_labels(["Movie"]).validate(),
            Err(ProjectionError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_orientation_serde() {
        assert_eq!(serde_json::to_string(&Orientation::Undirected).unwrap(), "\"undirected\"");
        let o: Orientation = serde_yaml::from_str("reverse").unwrap();
        assert_eq!(o, Orientation::Reverse);
    }
}
