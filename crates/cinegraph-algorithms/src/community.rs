//! Community detection
//!
//! Louvain modularity optimization. Edge direction is ignored: every
//! relationship `u -> v` contributes its weight to both `A[u][v]` and `A[v][u]`.

use super::common::{GraphView, NodeId};
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Louvain configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LouvainConfig {
    /// Maximum number of aggregation levels
    pub max_levels: usize,
    /// Maximum local-moving sweeps per level
    pub max_iterations: usize,
    /// Minimum modularity gain for a move to count
    pub tolerance: f64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            max_levels: 10,
            max_iterations: 10,
            tolerance: 1e-7,
        }
    }
}

/// Result of the Louvain algorithm
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LouvainResult {
    /// Map of NodeId -> community id (dense, 0..community_count)
    pub node_community: HashMap<NodeId, u64>,
    /// Number of distinct communities
    pub community_count: usize,
    /// Modularity of the final partition on the input graph
    pub modularity: f64,
    /// Number of aggregation levels that changed the partition
    pub levels: usize,
}

/// Symmetric weighted adjacency used at each level.
struct Level {
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl Level {
    fn from_view(view: &GraphView) -> Self {
        let n = view.node_count;
        let mut rows: Vec<FxHashMap<usize, f64>> = vec![FxHashMap::default(); n];
        for u in 0..n {
            for (k, &v) in view.successors(u).iter().enumerate() {
                let w = view.edge_weight(u, k);
                *rows[u].entry(v).or_insert(0.0) += w;
                if u != v {
                    *rows[v].entry(u).or_insert(0.0) += w;
                }
            }
        }
        Self::from_rows(rows)
    }

    fn from_rows(rows: Vec<FxHashMap<usize, f64>>) -> Self {
        let adjacency = rows
            .into_iter()
            .map(|row| {
                let mut entries: Vec<(usize, f64)> = row.into_iter().collect();
                entries.sort_by_key(|&(j, _)| j);
                entries
            })
            .collect();
        Level { adjacency }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn strength(&self, i: usize) -> f64 {
        self.adjacency[i].iter().map(|&(_, w)| w).sum()
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut rows: Vec<FxHashMap<usize, f64>> = vec![FxHashMap::default(); count];
        for (i, row) in self.adjacency.iter().enumerate() {
            for &(j, w) in row {
                *rows[community[i]].entry(community[j]).or_insert(0.0) += w;
            }
        }
        Level::from_rows(rows)
    }
}

/// Run Louvain community detection on the view.
pub fn louvain(view: &GraphView, config: LouvainConfig) -> LouvainResult {
    let n = view.node_count;
    let base = Level::from_view(view);
    let total_weight: f64 = (0..n).map(|i| base.strength(i)).sum();

    // Community of every original node, refined level by level
    let mut membership: Vec<usize> = (0..n).collect();
    let mut levels = 0;

    if total_weight > 0.0 {
        let mut level = Level::from_view(view);
        for _ in 0..config.max_levels {
            let (community, moved) = local_moving(&level, total_weight, &config);
            if !moved {
                break;
            }
            let (renumbered, count) = renumber(&community);
            for m in membership.iter_mut() {
                *m = renumbered[*m];
            }
            levels += 1;
            if count == level.len() {
                break;
            }
            level = level.aggregate(&renumbered, count);
        }
    }

    let (membership, community_count) = renumber(&membership);
    let modularity = modularity(&base, &membership, community_count, total_weight);

    let node_community = membership
        .iter()
        .enumerate()
        .map(|(idx, &c)| (view.index_to_node[idx], c as u64))
        .collect();

    LouvainResult {
        node_community,
        community_count,
        modularity,
        levels,
    }
}

/// Phase one: move single nodes between communities while modularity improves.
fn local_moving(level: &Level, total_weight: f64, config: &LouvainConfig) -> (Vec<usize>, bool) {
    let n = level.len();
    let mut community: Vec<usize> = (0..n).collect();
    let strength: Vec<f64> = (0..n).map(|i| level.strength(i)).collect();
    let mut tot = strength.clone();
    let mut moved_any = false;

    for _ in 0..config.max_iterations {
        let mut moved = false;

        for i in 0..n {
            let current = community[i];
            let k_i = strength[i];

            let mut links: Vec<(usize, f64)> = Vec::new();
            for &(j, w) in &level.adjacency[i] {
                if j == i {
                    continue;
                }
                match links.iter_mut().find(|entry| entry.0 == community[j]) {
                    Some(entry) => entry.1 += w,
                    None => links.push((community[j], w)),
                }
            }

            tot[current] -= k_i;

            let gain = |c: usize, k_in: f64| k_in - tot[c] * k_i / total_weight;
            let current_links = links
                .iter()
                .find(|(c, _)| *c == current)
                .map(|&(_, w)| w)
                .unwrap_or(0.0);

            let mut best = current;
            let mut best_gain = gain(current, current_links);
            for &(c, k_in) in &links {
                let g = gain(c, k_in);
                if g > best_gain + config.tolerance {
                    best = c;
                    best_gain = g;
                }
            }

            tot[best] += k_i;
            if best != current {
                community[i] = best;
                moved = true;
                moved_any = true;
            }
        }

        if !moved {
            break;
        }
    }

    (community, moved_any)
}

/// Map arbitrary community labels onto 0..count in order of first appearance.
fn renumber(community: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: FxHashMap<usize, usize> = FxHashMap::default();
    let renumbered: Vec<usize> = community
        .iter()
        .map(|c| {
            let next = mapping.len();
            *mapping.entry(*c).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

fn modularity(level: &Level, membership: &[usize], count: usize, total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    let mut internal = vec![0.0; count];
    let mut tot = vec![0.0; count];
    for (i, row) in level.adjacency.iter().enumerate() {
        let c = membership[i];
        for &(j, w) in row {
            tot[c] += w;
            if membership[j] == c {
                internal[c] += w;
            }
        }
    }
    internal
        .iter()
        .zip(tot.iter())
        .map(|(&inside, &t)| inside / total_weight - (t / total_weight).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by a single bridge edge.
    fn two_triangles() -> GraphView {
        GraphView::from_edges(
            vec![1, 2, 3, 4, 5, 6],
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 0, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (5, 3, 1.0),
                (2, 3, 1.0),
            ],
            false,
        )
    }

    #[test]
    fn test_louvain_separates_triangles() {
        let result = louvain(&two_triangles(), LouvainConfig::default());

        assert_eq!(result.community_count, 2);
        let c = &result.node_community;
        assert_eq!(c[&1], c[&2]);
        assert_eq!(c[&2], c[&3]);
        assert_eq!(c[&4], c[&5]);
        assert_eq!(c[&5], c[&6]);
        assert_ne!(c[&1], c[&4]);
        assert!(result.modularity > 0.3);
    }

    #[test]
    fn test_louvain_without_edges_keeps_singletons() {
        let view = GraphView::from_edges(vec![1, 2, 3], &[], false);
        let result = louvain(&view, LouvainConfig::default());
        assert_eq!(result.community_count, 3);
        assert_eq!(result.modularity, 0.0);
        assert_eq!(result.levels, 0);
    }

    #[test]
    fn test_renumber_is_dense() {
        let (renumbered, count) = renumber(&[7, 7, 3, 9, 3]);
        assert_eq!(renumbered, vec![0, 0, 1, 2, 1]);
        assert_eq!(count, 3);
    }
}
