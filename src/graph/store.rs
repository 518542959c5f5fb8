//! In-memory graph storage
//!
//! Arena storage for nodes and edges with label, edge-type and unique-key
//! indexes. Merge operations (`merge_node`, `merge_edge`) are the only
//! creation path the rest of the crate uses, so keys never duplicate.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, Label, NodeId, NodeKey};
use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during graph operations
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("No node matches key {0}")]
    KeyNotFound(NodeKey),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Key property {property} of node {node} cannot be changed")]
    KeyPropertyImmutable { node: NodeId, property: String },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Unique key index entry: (label, key property, key value)
type KeyIndexEntry = (Label, String, String);

/// In-memory graph storage
///
/// - nodes / edges: arenas indexed by id, `None` marks a freed slot
/// - outgoing / incoming: adjacency lists of edge ids per node slot
/// - label_index, edge_type_index: secondary indexes for scans
/// - key_index: unique (label, property, value) -> node
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    free_node_ids: Vec<u64>,
    free_edge_ids: Vec<u64>,
    label_index: HashMap<Label, HashSet<NodeId>>,
    edge_type_index: HashMap<EdgeType, HashSet<EdgeId>>,
    key_index: FxHashMap<KeyIndexEntry, NodeId>,
    /// Key properties registered per node, so deletes can clean the key index
    node_keys: FxHashMap<NodeId, Vec<KeyIndexEntry>>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let id = self.free_node_ids.pop().unwrap_or(self.nodes.len() as u64);
        let slot = id as usize;
        if slot >= self.nodes.len() {
            self.nodes.resize(slot + 1, None);
            self.outgoing.resize(slot + 1, Vec::new());
            self.incoming.resize(slot + 1, Vec::new());
        }
        NodeId::new(id)
    }

    fn allocate_edge_id(&mut self) -> EdgeId {
        let id = self.free_edge_ids.pop().unwrap_or(self.edges.len() as u64);
        let slot = id as usize;
        if slot >= self.edges.len() {
            self.edges.resize(slot + 1, None);
        }
        EdgeId::new(id)
    }

    /// Create a node with a single label and no properties
    pub fn create_node(&mut self, label: impl Into<Label>) -> NodeId {
        self.create_node_with_properties(vec![label.into()], PropertyMap::new())
    }

    /// Create a node with labels and properties
    pub fn create_node_with_properties(&mut self, labels: Vec<Label>, properties: PropertyMap) -> NodeId {
        let id = self.allocate_node_id();
        for label in &labels {
            self.label_index.entry(label.clone()).or_default().insert(id);
        }
        self.nodes[id.slot()] = Some(Node::new_with_properties(id, labels, properties));
        id
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Set a property on a node.
    ///
    /// Key properties registered through `merge_node` cannot be rewritten here.
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<Option<PropertyValue>> {
        let key = key.into();
        if let Some(entries) = self.node_keys.get(&id) {
            if entries.iter().any(|(_, property, _)| *property == key) {
                return Err(GraphError::KeyPropertyImmutable { node: id, property: key });
            }
        }
        let node = self
            .nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::NodeNotFound(id))?;
        Ok(node.set_property(key, value))
    }

    /// Look a node up by its unique key
    pub fn find_node(&self, key: &NodeKey) -> Option<NodeId> {
        self.key_index
            .get(&(key.label.clone(), key.property.clone(), key.value.clone()))
            .copied()
    }

    /// Create the node identified by `key` if absent, then set `properties` on it.
    ///
    /// Returns the node id and whether the node was created.
    pub fn merge_node(&mut self, key: &NodeKey, properties: PropertyMap) -> GraphResult<(NodeId, bool)> {
        if let Some(id) = self.find_node(key) {
            for (k, v) in properties {
                if k == key.property {
                    continue;
                }
                self.set_node_property(id, k, v)?;
            }
            return Ok((id, false));
        }

        let mut props = properties;
        props.insert(key.property.clone(), PropertyValue::String(key.value.clone()));
        let id = self.create_node_with_properties(vec![key.label.clone()], props);

        let entry = (key.label.clone(), key.property.clone(), key.value.clone());
        self.key_index.insert(entry.clone(), id);
        self.node_keys.entry(id).or_default().push(entry);
        debug!("Merged new node {} for key {}", id, key);
        Ok((id, true))
    }

    /// Delete a node and all its connected edges
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<Node> {
        let node = self
            .nodes
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or(GraphError::NodeNotFound(id))?;

        for label in &node.labels {
            if let Some(set) = self.label_index.get_mut(label) {
                set.remove(&id);
            }
        }
        if let Some(entries) = self.node_keys.remove(&id) {
            for entry in entries {
                self.key_index.remove(&entry);
            }
        }

        let outgoing = std::mem::take(&mut self.outgoing[id.slot()]);
        let incoming = std::mem::take(&mut self.incoming[id.slot()]);
        let attached: BTreeSet<EdgeId> = outgoing.into_iter().chain(incoming).collect();
        for edge_id in attached {
            // Self-loops appear in both lists; the second delete finds nothing
            let _ = self.delete_edge(edge_id);
        }

        self.free_node_ids.push(id.as_u64());
        Ok(node)
    }

    /// Create an edge between two nodes
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        if !self.has_node(source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.has_node(target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let id = self.allocate_edge_id();
        let edge_type = edge_type.into();
        self.outgoing[source.slot()].push(id);
        self.incoming[target.slot()].push(id);
        self.edge_type_index.entry(edge_type.clone()).or_default().insert(id);
        self.edges[id.slot()] = Some(Edge::new(id, source, target, edge_type, properties));
        Ok(id)
    }

    /// Find the edge of `edge_type` from `source` to `target`
    pub fn find_edge(&self, source: NodeId, target: NodeId, edge_type: &EdgeType) -> Option<EdgeId> {
        self.get_outgoing_edges(source)
            .into_iter()
            .find(|e| e.target == target && e.edge_type == *edge_type)
            .map(|e| e.id)
    }

    /// Create the `edge_type` edge between the pair if absent, then set `properties` on it.
    pub fn merge_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<(EdgeId, bool)> {
        let edge_type = edge_type.into();
        match self.find_edge(source, target, &edge_type) {
            Some(id) => {
                let edge = self.get_edge_mut(id).ok_or(GraphError::EdgeNotFound(id))?;
                for (k, v) in properties {
                    edge.set_property(k, v);
                }
                Ok((id, false))
            }
            None => self.create_edge(source, target, edge_type, properties).map(|id| (id, true)),
        }
    }

    /// Get an edge by ID
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.slot()).and_then(Option::as_ref)
    }

    /// Get a mutable edge by ID
    pub fn get_edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Delete an edge
    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self
            .edges
            .get_mut(id.slot())
            .and_then(Option::take)
            .ok_or(GraphError::EdgeNotFound(id))?;

        if let Some(set) = self.edge_type_index.get_mut(&edge.edge_type) {
            set.remove(&id);
        }
        if let Some(adj) = self.outgoing.get_mut(edge.source.slot()) {
            adj.retain(|&eid| eid != id);
        }
        if let Some(adj) = self.incoming.get_mut(edge.target.slot()) {
            adj.retain(|&eid| eid != id);
        }

        self.free_edge_ids.push(id.as_u64());
        Ok(edge)
    }

    /// Get all outgoing edges from a node
    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.slot())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a node
    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.slot())
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Get all nodes with a specific label, ordered by id
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self
            .label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Get all edges of a specific type, ordered by id
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self
            .edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default();
        edges.sort_by_key(|e| e.id);
        edges
    }

    /// Number of nodes carrying each label
    pub fn label_counts(&self) -> Vec<(Label, usize)> {
        let mut counts: Vec<(Label, usize)> = self
            .label_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(label, ids)| (label.clone(), ids.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Number of edges of each type
    pub fn edge_type_counts(&self) -> Vec<(EdgeType, usize)> {
        let mut counts: Vec<(EdgeType, usize)> = self
            .edge_type_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(edge_type, ids)| (edge_type.clone(), ids.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// All nodes, ordered by id
    pub fn all_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().flatten().collect()
    }

    /// All edges, ordered by id
    pub fn all_edges(&self) -> Vec<&Edge> {
        self.edges.iter().flatten().collect()
    }

    /// Remove every node and edge
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
