//! Graph-store collaborator interface
//!
//! Every component that touches the graph receives a `GraphBackend` handle
//! from its caller. Reads and writes beyond plain upserts go through a small
//! set of parameterized canned queries (`ReadQuery`, `WriteQuery`) that
//! return tabular rows.

use crate::graph::{
    EdgeId, EdgeType, GraphError, GraphResult, GraphStore, Label, NodeId, NodeKey, PropertyMap,
    PropertyValue,
};
use crate::schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One result row, columns in query order
pub type Row = IndexMap<String, PropertyValue>;

/// String column of a row
pub fn row_str<'r>(row: &'r Row, column: &str) -> Option<&'r str> {
    row.get(column).and_then(|v| v.as_string())
}

/// Numeric column of a row
pub fn row_number(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(|v| v.as_number())
}

/// Parameterized read queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadQuery {
    /// Every RATED relationship: columns `user`, `item`, `score`
    Ratings,
    /// Titles the user has rated: column `item`
    RatedItems { username: String },
    /// Key values of every node with the label: column `key`
    NodeKeys { label: Label },
    /// Columns `label`, `count`, ordered by count descending
    LabelCounts,
    /// Columns `type`, `count`, ordered by count descending
    RelationshipCounts,
    /// Columns `id`, `label`, `name`, `outgoing`, `incoming`, `degree`
    NodeDegrees,
    /// Case-insensitive substring match on name or title: columns `label`, `name`
    Search { term: String, limit: usize },
}

/// Parameterized write queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteQuery {
    /// Delete the relationship of `edge_type` between two keyed nodes
    DeleteRelationship {
        source: NodeKey,
        target: NodeKey,
        edge_type: EdgeType,
    },
    /// Detach-delete every node
    DeleteAll,
}

/// Outcome of a write query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub nodes_deleted: usize,
    pub relationships_deleted: usize,
    /// Properties of the removed relationship, for single-relationship deletes
    pub removed: Option<PropertyMap>,
}

/// A node of an extracted subgraph
#[derive(Debug, Clone, PartialEq)]
pub struct SubgraphNode {
    pub id: NodeId,
    pub label: Label,
    pub name: String,
}

/// Nodes and directed edges restricted to some labels and relationship types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<(NodeId, NodeId)>,
}

/// Operations the core needs from a property graph store
pub trait GraphBackend {
    /// Merge the node identified by `key`, then set `properties` on it
    fn upsert_node(&mut self, key: &NodeKey, properties: PropertyMap) -> GraphResult<NodeId>;

    /// Merge at most one `edge_type` relationship between two existing keyed nodes
    fn upsert_relationship(
        &mut self,
        source: &NodeKey,
        target: &NodeKey,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId>;

    /// Detach-delete the node identified by `key`; false when it does not exist
    fn delete_node_cascade(&mut self, key: &NodeKey) -> GraphResult<bool>;

    fn run_read(&self, query: &ReadQuery) -> GraphResult<Vec<Row>>;

    fn run_write(&mut self, query: &WriteQuery) -> GraphResult<WriteSummary>;

    /// Nodes carrying any of `node_labels` and the edges among them whose type
    /// is one of `relationship_types`
    fn subgraph(&self, node_labels: &[Label], relationship_types: &[EdgeType]) -> GraphResult<Subgraph>;
}

impl GraphStore {
    fn resolve(&self, key: &NodeKey) -> GraphResult<NodeId> {
        self.find_node(key).ok_or_else(|| GraphError::KeyNotFound(key.clone()))
    }

    fn key_value(&self, id: NodeId, property: &str) -> Option<String> {
        self.get_node(id)
            .and_then(|n| n.get_property(property))
            .and_then(|v| v.as_string())
            .map(str::to_string)
    }

    fn rating_rows(&self) -> Vec<Row> {
        self.get_edges_by_type(&EdgeType::new(schema::RATED))
            .into_iter()
            .filter_map(|edge| {
                let user = self.key_value(edge.source, schema::USER_KEY)?;
                let item = self.key_value(edge.target, schema::MOVIE_KEY)?;
                let score = edge.get_property(schema::SCORE).cloned().unwrap_or(PropertyValue::Null);
                let mut row = Row::new();
                row.insert("user".to_string(), user.into());
                row.insert("item".to_string(), item.into());
                row.insert("score".to_string(), score);
                Some(row)
            })
            .collect()
    }

    fn rated_item_rows(&self, username: &str) -> Vec<Row> {
        let key = NodeKey::new(schema::USER, schema::USER_KEY, username);
        let Some(user) = self.find_node(&key) else {
            return Vec::new();
        };
        let rated = EdgeType::new(schema::RATED);
        self.get_outgoing_edges(user)
            .into_iter()
            .filter(|e| e.edge_type == rated)
            .filter_map(|e| self.key_value(e.target, schema::MOVIE_KEY))
            .map(|item| {
                let mut row = Row::new();
                row.insert("item".to_string(), item.into());
                row
            })
            .collect()
    }

    fn counted_rows<K: ToString>(column: &str, mut counts: Vec<(K, usize)>) -> Vec<Row> {
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .map(|(name, count)| {
                let mut row = Row::new();
                row.insert(column.to_string(), name.to_string().into());
                row.insert("count".to_string(), (count as i64).into());
                row
            })
            .collect()
    }

    fn degree_rows(&self) -> Vec<Row> {
        self.all_nodes()
            .into_iter()
            .map(|node| {
                let outgoing = self.get_outgoing_edges(node.id).len() as i64;
                let incoming = self.get_incoming_edges(node.id).len() as i64;
                let mut row = Row::new();
                row.insert("id".to_string(), (node.id.as_u64() as i64).into());
                row.insert(
                    "label".to_string(),
                    node.primary_label().map(|l| l.to_string()).into(),
                );
                row.insert("name".to_string(), node.display_name().map(str::to_string).into());
                row.insert("outgoing".to_string(), outgoing.into());
                row.insert("incoming".to_string(), incoming.into());
                row.insert("degree".to_string(), (outgoing + incoming).into());
                row
            })
            .collect()
    }

    fn search_rows(&self, term: &str, limit: usize) -> Vec<Row> {
        let needle = term.to_lowercase();
        self.all_nodes()
            .into_iter()
            .filter_map(|node| {
                let name = [schema::PERSON_KEY, schema::MOVIE_KEY]
                    .iter()
                    .find_map(|p| node.get_property(p).and_then(|v| v.as_string()))?;
                if !name.to_lowercase().contains(&needle) {
                    return None;
                }
                let mut row = Row::new();
                row.insert(
                    "label".to_string(),
                    node.primary_label().map(|l| l.to_string()).into(),
                );
                row.insert("name".to_string(), name.into());
                Some(row)
            })
            .take(limit)
            .collect()
    }
}

impl GraphBackend for GraphStore {
    fn upsert_node(&mut self, key: &NodeKey, properties: PropertyMap) -> GraphResult<NodeId> {
        self.merge_node(key, properties).map(|(id, _)| id)
    }

    fn upsert_relationship(
        &mut self,
        source: &NodeKey,
        target: &NodeKey,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let source_id = self.resolve(source)?;
        let target_id = self.resolve(target)?;
        self.merge_edge(source_id, target_id, edge_type.clone(), properties)
            .map(|(id, _)| id)
    }

    fn delete_node_cascade(&mut self, key: &NodeKey) -> GraphResult<bool> {
        match self.find_node(key) {
            Some(id) => {
                self.delete_node(id)?;
                debug!("Detach-deleted {}", key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn run_read(&self, query: &ReadQuery) -> GraphResult<Vec<Row>> {
        let rows = match query {
            ReadQuery::Ratings => self.rating_rows(),
            ReadQuery::RatedItems { username } => self.rated_item_rows(username),
            ReadQuery::NodeKeys { label } => self
                .get_nodes_by_label(label)
                .into_iter()
                .filter_map(|n| n.display_name().map(str::to_string))
                .map(|key| {
                    let mut row = Row::new();
                    row.insert("key".to_string(), key.into());
                    row
                })
                .collect(),
            ReadQuery::LabelCounts => Self::counted_rows("label", self.label_counts()),
            ReadQuery::RelationshipCounts => Self::counted_rows("type", self.edge_type_counts()),
            ReadQuery::NodeDegrees => self.degree_rows(),
            ReadQuery::Search { term, limit } => self.search_rows(term, *limit),
        };
        Ok(rows)
    }

    fn run_write(&mut self, query: &WriteQuery) -> GraphResult<WriteSummary> {
        match query {
            WriteQuery::DeleteRelationship {
                source,
                target,
                edge_type,
            } => {
                let (Some(s), Some(t)) = (self.find_node(source), self.find_node(target)) else {
                    return Ok(WriteSummary::default());
                };
                match self.find_edge(s, t, edge_type) {
                    Some(edge_id) => {
                        let edge = self.delete_edge(edge_id)?;
                        Ok(WriteSummary {
                            relationships_deleted: 1,
                            removed: Some(edge.properties),
                            ..Default::default()
                        })
                    }
                    None => Ok(WriteSummary::default()),
                }
            }
            WriteQuery::DeleteAll => {
                let summary = WriteSummary {
                    nodes_deleted: self.node_count(),
                    relationships_deleted: self.edge_count(),
                    removed: None,
                };
                self.clear();
                Ok(summary)
            }
        }
    }

    fn subgraph(&self, node_labels: &[Label], relationship_types: &[EdgeType]) -> GraphResult<Subgraph> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for label in node_labels {
            for node in self.get_nodes_by_label(label) {
                if seen.insert(node.id) {
                    nodes.push(SubgraphNode {
                        id: node.id,
                        label: label.clone(),
                        name: node
                            .display_name()
                            .map(str::to_string)
                            .unwrap_or_else(|| node.id.to_string()),
                    });
                }
            }
        }
        nodes.sort_by_key(|n| n.id);

        let mut edges = Vec::new();
        for edge_type in relationship_types {
            for edge in self.get_edges_by_type(edge_type) {
                if seen.contains(&edge.source) && seen.contains(&edge.target) {
                    edges.push((edge.source, edge.target));
                }
            }
        }
        Ok(Subgraph { nodes, edges })
    }
}
