//! In-process algorithm service
//!
//! Keeps projections as dense `GraphView` snapshots built from the graph
//! backend and runs the `cinegraph-algorithms` implementations on them.
//! This module is the adapter between store identifiers and the dense
//! indices the algorithms work with.

use crate::backend::{GraphBackend, Subgraph};
use crate::projection::{
    AlgorithmService, CommunityAssignment, CommunityResult, EntityScore, Orientation, ProjectionError,
    ProjectionInfo, ProjectionResult, ProjectionSpec, SimilarityScore,
};
use cinegraph_algorithms::{GraphView, NodeId as AlgoNodeId};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use tracing::debug;

// Re-export algorithm configurations
pub use cinegraph_algorithms::{LouvainConfig, PageRankConfig, SimilarityConfig};

/// Display name and label of a projected node
#[derive(Debug, Clone)]
struct Entity {
    name: String,
    label: String,
}

#[derive(Debug, Clone)]
struct Projection {
    view: GraphView,
    entities: FxHashMap<AlgoNodeId, Entity>,
    info: ProjectionInfo,
}

impl Projection {
    fn entity(&self, id: AlgoNodeId) -> (String, String) {
        self.entities
            .get(&id)
            .map(|e| (e.name.clone(), e.label.clone()))
            .unwrap_or_else(|| (id.to_string(), String::new()))
    }

    fn ranked(&self, scores: HashMap<AlgoNodeId, f64>) -> Vec<EntityScore> {
        let mut ranked: Vec<EntityScore> = scores
            .into_iter()
            .map(|(id, score)| {
                let (entity, label) = self.entity(id);
                EntityScore { entity, label, score }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.entity.cmp(&b.entity))
                .then_with(|| a.label.cmp(&b.label))
        });
        ranked
    }
}

/// Build a dense view of a subgraph, applying the orientation
pub fn build_view(subgraph: &Subgraph, orientation: Orientation) -> GraphView {
    let nodes: Vec<AlgoNodeId> = subgraph.nodes.iter().map(|n| n.id.as_u64()).collect();
    let index: HashMap<AlgoNodeId, usize> = nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut edges = Vec::with_capacity(subgraph.edges.len() * 2);
    for (source, target) in &subgraph.edges {
        let (Some(&u), Some(&v)) = (index.get(&source.as_u64()), index.get(&target.as_u64())) else {
            continue;
        };
        match orientation {
            Orientation::Natural => edges.push((u, v, 1.0)),
            Orientation::Reverse => edges.push((v, u, 1.0)),
            Orientation::Undirected => {
                edges.push((u, v, 1.0));
                edges.push((v, u, 1.0));
            }
        }
    }
    GraphView::from_edges(nodes, &edges, false)
}

/// Algorithm service holding projections in process memory
#[derive(Debug, Default)]
pub struct InProcessAlgorithms {
    projections: IndexMap<String, Projection>,
}

impl InProcessAlgorithms {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, name: &str) -> ProjectionResult<&Projection> {
        self.projections
            .get(name)
            .ok_or_else(|| ProjectionError::NotFound(name.to_string()))
    }
}

impl AlgorithmService for InProcessAlgorithms {
    fn project(&mut self, graph: &dyn GraphBackend, spec: &ProjectionSpec) -> ProjectionResult<ProjectionInfo> {
        if self.projections.contains_key(&spec.name) {
            return Err(ProjectionError::AlreadyExists(spec.name.clone()));
        }
        let subgraph = graph.subgraph(&spec.node_labels, &spec.relationship_types)?;
        let view = build_view(&subgraph, spec.orientation);
        let entities = subgraph
            .nodes
            .iter()
            .map(|n| {
                (
                    n.id.as_u64(),
                    Entity {
                        name: n.name.clone(),
                        label: n.label.to_string(),
                    },
                )
            })
            .collect();
        let info = ProjectionInfo {
            name: spec.name.clone(),
            node_count: view.node_count,
            relationship_count: view.edge_count(),
            orientation: spec.orientation,
        };
        debug!("Projected '{}' from {} stored edges", spec.name, subgraph.edges.len());
        self.projections.insert(
            spec.name.clone(),
            Projection {
                view,
                entities,
                info: info.clone(),
            },
        );
        Ok(info)
    }

    fn drop_projection(&mut self, name: &str) -> ProjectionResult<ProjectionInfo> {
        self.projections
            .shift_remove(name)
            .map(|p| p.info)
            .ok_or_else(|| ProjectionError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.projections.contains_key(name)
    }

    fn list(&self) -> Vec<ProjectionInfo> {
        self.projections.values().map(|p| p.info.clone()).collect()
    }

    fn degree_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>> {
        let projection = self.get(name)?;
        Ok(projection.ranked(cinegraph_algorithms::degree_centrality(&projection.view)))
    }

    fn betweenness_centrality(&self, name: &str) -> ProjectionResult<Vec<EntityScore>> {
        let projection = self.get(name)?;
        Ok(projection.ranked(cinegraph_algorithms::betweenness_centrality(&projection.view)))
    }

    fn page_rank(&self, name: &str, config: PageRankConfig) -> ProjectionResult<Vec<EntityScore>> {
        let projection = self.get(name)?;
        Ok(projection.ranked(cinegraph_algorithms::page_rank(&projection.view, config)))
    }

    fn louvain(&self, name: &str, config: LouvainConfig) -> ProjectionResult<CommunityResult> {
        let projection = self.get(name)?;
        let result = cinegraph_algorithms::louvain(&projection.view, config);

        let mut assignments: Vec<CommunityAssignment> = result
            .node_community
            .iter()
            .map(|(&id, &community)| {
                let (entity, label) = projection.entity(id);
                CommunityAssignment {
                    entity,
                    label,
                    community,
                }
            })
            .collect();
        assignments.sort_by(|a, b| a.community.cmp(&b.community).then_with(|| a.entity.cmp(&b.entity)));

        Ok(CommunityResult {
            assignments,
            community_count: result.community_count,
            modularity: result.modularity,
        })
    }

    fn node_similarity(&self, name: &str, config: SimilarityConfig) -> ProjectionResult<Vec<SimilarityScore>> {
        let projection = self.get(name)?;
        Ok(cinegraph_algorithms::node_similarity(&projection.view, config)
            .into_iter()
            .map(|pair| SimilarityScore {
                first: projection.entity(pair.first).0,
                second: projection.entity(pair.second).0,
                similarity: pair.similarity,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Role};
    use crate::config::RatingScale;
    use crate::graph::GraphStore;

    fn movie_graph() -> GraphStore {
        let mut store = GraphStore::new();
        let mut catalog = Catalog::new(&mut store, RatingScale::default());
        catalog.add_movie("Heat", Some(1995), &["Crime".into(), "Drama".into()]).unwrap();
        catalog.add_movie("Collateral", Some(2004), &["Crime".into(), "Drama".into()]).unwrap();
        catalog.add_movie("Ali", Some(2001), &["Drama".into()]).unwrap();
        catalog.add_person("Michael Mann", None, None, &[Role::Director]).unwrap();
        for title in ["Heat", "Collateral", "Ali"] {
            catalog.link_person_to_movie("Michael Mann", title, &[Role::Director]).unwrap();
        }
        store
    }

    fn spec(name: &str, orientation: Orientation) -> ProjectionSpec {
        ProjectionSpec::new(name)
            .with_labels(["Person", "Movie", "Genre"])
            .with_relationship_types(["DIRECTOR", "IN_GENRE"])
            .with_orientation(orientation)
    }

    #[test]
    fn test_project_counts() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        let info = service.project(&store, &spec("g", Orientation::Natural)).unwrap();
        assert_eq!(info.node_count, 6);
        assert_eq!(info.relationship_count, 8);

        let undirected = service.project(&store, &spec("u", Orientation::Undirected)).unwrap();
        assert_eq!(undirected.relationship_count, 16);
        assert_eq!(service.list().len(), 2);

        assert_eq!(
            service.project(&store, &spec("g", Orientation::Natural)),
            Err(ProjectionError::AlreadyExists("g".into()))
        );
    }

    #[test]
    fn test_degree_is_ranked() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        service.project(&store, &spec("g", Orientation::Natural)).unwrap();

        let scores = service.degree_centrality("g").unwrap();
        assert_eq!(scores[0].entity, "Michael Mann");
        assert_eq!(scores[0].score, 3.0);
        assert_eq!(scores[0].label, "Person");
        // Heat and Collateral tie at 2.0 and are ordered by name
        assert_eq!(scores[1].entity, "Collateral");
        assert_eq!(scores[2].entity, "Heat");
    }

    #[test]
    fn test_reverse_orientation_ranks_genres() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        service.project(&store, &spec("r", Orientation::Reverse)).unwrap();
        let scores = service.degree_centrality("r").unwrap();
        assert_eq!(scores[0].entity, "Drama");
        assert_eq!(scores[0].score, 3.0);
    }

    #[test]
    fn test_similarity_uses_names() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        service.project(&store, &spec("g", Orientation::Natural)).unwrap();
        let pairs = service.node_similarity("g", SimilarityConfig::default()).unwrap();
        let top = &pairs[0];
        assert_eq!(top.similarity, 1.0);
        let mut names = [top.first.as_str(), top.second.as_str()];
        names.sort();
        assert_eq!(names, ["Collateral", "Heat"]);
    }

    #[test]
    fn test_louvain_and_pagerank_cover_every_node() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        service.project(&store, &spec("g", Orientation::Natural)).unwrap();

        let communities = service.louvain("g", LouvainConfig::default()).unwrap();
        assert_eq!(communities.assignments.len(), 6);
        assert!(communities.community_count >= 1);

        let ranks = service.page_rank("g", PageRankConfig::default()).unwrap();
        assert_eq!(ranks.len(), 6);
        assert_eq!(ranks[0].entity, "Drama");
    }

    #[test]
    fn test_drop_and_missing() {
        let store = movie_graph();
        let mut service = InProcessAlgorithms::new();
        service.project(&store, &spec("g", Orientation::Natural)).unwrap();
        assert!(service.drop_projection("g").is_ok());
        assert!(!service.exists("g"));
        assert_eq!(service.drop_projection("g"), Err(ProjectionError::NotFound("g".into())));
        assert_eq!(service.degree_centrality("g"), Err(ProjectionError::NotFound("g".into())));
    }
}
