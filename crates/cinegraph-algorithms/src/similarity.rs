//! Node similarity
//!
//! Jaccard similarity between nodes based on the sets of nodes they point to.
//! Two movies sharing most of their genres and cast score close to 1.0.

use super::common::{GraphView, NodeId};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

/// Node similarity configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimilarityConfig {
    /// Keep at most this many neighbours per node
    pub top_k: usize,
    /// Pairs with similarity at or below this value are dropped
    pub similarity_cutoff: f64,
    /// Nodes with fewer distinct targets are not compared
    pub degree_cutoff: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            similarity_cutoff: 0.0,
            degree_cutoff: 1,
        }
    }
}

/// One unordered pair of similar nodes, `first < second`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimilarityPair {
    pub first: NodeId,
    pub second: NodeId,
    pub similarity: f64,
}

/// Compute Jaccard node similarity.
///
/// Pairs are returned once, sorted by similarity descending and then by
/// node ids ascending.
pub fn node_similarity(view: &GraphView, config: SimilarityConfig) -> Vec<SimilarityPair> {
    let n = view.node_count;

    let targets: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let mut t = view.successors(i).to_vec();
            t.sort_unstable();
            t.dedup();
            t
        })
        .collect();

    let mut sources_of: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, t) in targets.iter().enumerate() {
        for &target in t {
            sources_of[target].push(i);
        }
    }

    let per_node: Vec<Vec<(usize, usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let degree = targets[i].len();
            if degree == 0 || degree < config.degree_cutoff {
                return Vec::new();
            }

            let mut shared: FxHashMap<usize, usize> = FxHashMap::default();
            for &t in &targets[i] {
                for &j in &sources_of[t] {
                    if j != i {
                        *shared.entry(j).or_insert(0) += 1;
                    }
                }
            }

            let mut scored: Vec<(usize, usize, f64)> = shared
                .into_iter()
                .filter(|&(j, _)| targets[j].len() >= config.degree_cutoff)
                .map(|(j, inter)| {
                    let union = degree + targets[j].len() - inter;
                    (i, j, inter as f64 / union as f64)
                })
                .filter(|&(_, _, s)| s > config.similarity_cutoff)
                .collect();

            scored.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.1.cmp(&b.1)));
            scored.truncate(config.top_k);
            scored
        })
        .collect();

    let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut pairs: Vec<SimilarityPair> = Vec::new();
    for (i, j, similarity) in per_node.into_iter().flatten() {
        let (a, b) = if view.index_to_node[i] <= view.index_to_node[j] { (i, j) } else { (j, i) };
        if seen.insert((a, b)) {
            pairs.push(SimilarityPair {
                first: view.index_to_node[a],
                second: view.index_to_node[b],
                similarity,
            });
        }
    }

    pairs.sort_by(|x, y| {
        y.similarity
            .total_cmp(&x.similarity)
            .then(x.first.cmp(&y.first))
            .then(x.second.cmp(&y.second))
    });
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Movies 1, 2, 3 pointing at genres 10, 11, 12.
    fn movies_and_genres() -> GraphView {
        GraphView::from_edges(
            vec![1, 2, 3, 10, 11, 12],
            &[
                (0, 3, 1.0),
                (0, 4, 1.0),
                (1, 3, 1.0),
                (1, 4, 1.0),
                (2, 4, 1.0),
                (2, 5, 1.0),
            ],
            false,
        )
    }

    #[test]
    fn test_jaccard_pairs() {
        let pairs = node_similarity(&movies_and_genres(), SimilarityConfig::default());

        assert_eq!(pairs[0], SimilarityPair { first: 1, second: 2, similarity: 1.0 });
        let one_three = pairs.iter().find(|p| p.first == 1 && p.second == 3).unwrap();
        assert!((one_three.similarity - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_top_k_limits_neighbours() {
        let config = SimilarityConfig { top_k: 1, ..SimilarityConfig::default() };
        let pairs = node_similarity(&movies_and_genres(), config);
        // 1 and 2 pick each other; 3 picks its best match (1, lower id on tie)
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_cutoff_drops_weak_pairs() {
        let config = SimilarityConfig { similarity_cutoff: 0.5, ..SimilarityConfig::default() };
        let pairs = node_similarity(&movies_and_genres(), config);
        assert_eq!(pairs.len(), 1);
    }
}
