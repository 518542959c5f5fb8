//! Shared utilities for graph algorithms
//!
//! Provides a read-only, dense view of a graph projection for algorithm execution.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
///
/// Node indices run over `0..node_count`; `index_to_node` maps them back to the
/// store identifiers the view was built from.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,

    /// Edge weights: aligned with `out_targets`
    pub weights: Option<Vec<f64>>,
}

impl GraphView {
    /// Build a view from node ids and a list of `(source_index, target_index, weight)` edges.
    ///
    /// Edges whose endpoints fall outside `0..nodes.len()` are ignored.
    pub fn from_edges(nodes: Vec<NodeId>, edges: &[(usize, usize, f64)], weighted: bool) -> Self {
        let node_count = nodes.len();
        let node_to_index = nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut out_weights: Vec<Vec<f64>> = vec![Vec::new(); node_count];

        for &(u, v, w) in edges {
            if u >= node_count || v >= node_count {
                continue;
            }
            outgoing[u].push(v);
            incoming[v].push(u);
            out_weights[u].push(w);
        }

        Self::from_adjacency_list(
            node_count,
            nodes,
            node_to_index,
            outgoing,
            incoming,
            if weighted { Some(out_weights) } else { None },
        )
    }

    /// Create a GraphView from adjacency lists
    pub fn from_adjacency_list(
        node_count: usize,
        index_to_node: Vec<NodeId>,
        node_to_index: HashMap<NodeId, usize>,
        outgoing: Vec<Vec<usize>>,
        incoming: Vec<Vec<usize>>,
        weights: Option<Vec<Vec<f64>>>,
    ) -> Self {
        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();
        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::new();
        let mut flat_weights = weights.as_ref().map(|_| Vec::new());

        out_offsets.push(0);
        for (i, neighbors) in outgoing.into_iter().enumerate() {
            out_targets.extend(neighbors);
            out_offsets.push(out_targets.len());

            if let (Some(w_flat), Some(w_rows)) = (flat_weights.as_mut(), weights.as_ref()) {
                w_flat.extend(w_rows[i].iter());
            }
        }

        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
            weights: flat_weights,
        }
    }

    /// Number of directed edges in the view
    pub fn edge_count(&self) -> usize {
        self.out_targets.len()
    }

    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.out_targets[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.in_sources[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }

    /// Get weights for outgoing edges of a node
    pub fn weights(&self, idx: usize) -> Option<&[f64]> {
        self.weights
            .as_ref()
            .map(|w| &w[self.out_offsets[idx]..self.out_offsets[idx + 1]])
    }

    /// Weight of the `k`-th outgoing edge of `idx`, 1.0 for unweighted views
    pub fn edge_weight(&self, idx: usize, k: usize) -> f64 {
        self.weights(idx).map(|w| w[k]).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_builds_csr() {
        // 10 -> 20 -> 30, 10 -> 30
        let view = GraphView::from_edges(vec![10, 20, 30], &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 2.5)], true);

        assert_eq!(view.node_count, 3);
        assert_eq!(view.edge_count(), 3);
        assert_eq!(view.successors(0), &[1, 2]);
        assert_eq!(view.predecessors(2), &[1, 0]);
        assert_eq!(view.out_degree(0), 2);
        assert_eq!(view.in_degree(0), 0);
        assert_eq!(view.edge_weight(0, 1), 2.5);
        assert_eq!(view.node_to_index[&20], 1);
    }

    #[test]
    fn test_out_of_range_edges_are_ignored() {
        let view = GraphView::from_edges(vec![1, 2], &[(0, 5, 1.0), (0, 1, 1.0)], false);
        assert_eq!(view.edge_count(), 1);
        assert!(view.weights.is_none());
        assert_eq!(view.edge_weight(0, 0), 1.0);
    }
}
