//! Centrality measures
//!
//! Degree and betweenness centrality over a [`GraphView`]. Both follow edge
//! direction as stored in the view; an undirected projection stores each
//! relationship in both directions.

use super::common::{GraphView, NodeId};
use rayon::prelude::*;
use std::collections::{HashMap, VecDeque};

/// Sources handled per parallel work unit in betweenness.
const SOURCE_CHUNK: usize = 64;

/// Degree centrality: the (weighted) out-degree of every node.
pub fn degree_centrality(view: &GraphView) -> HashMap<NodeId, f64> {
    (0..view.node_count)
        .map(|idx| {
            let score = match view.weights(idx) {
                Some(w) => w.iter().sum(),
                None => view.out_degree(idx) as f64,
            };
            (view.index_to_node[idx], score)
        })
        .collect()
}

/// Betweenness centrality (Brandes) on the unweighted topology.
///
/// Scores are not normalized. Sources are processed in fixed chunks in
/// parallel and the partial sums are added in chunk order, so results are
/// identical between runs.
pub fn betweenness_centrality(view: &GraphView) -> HashMap<NodeId, f64> {
    let n = view.node_count;
    if n == 0 {
        return HashMap::new();
    }

    let sources: Vec<usize> = (0..n).collect();
    let partials: Vec<Vec<f64>> = sources
        .par_chunks(SOURCE_CHUNK)
        .map(|chunk| {
            let mut acc = vec![0.0; n];
            for &s in chunk {
                accumulate_from_source(view, s, &mut acc);
            }
            acc
        })
        .collect();

    let mut scores = vec![0.0; n];
    for partial in partials {
        for (total, value) in scores.iter_mut().zip(partial) {
            *total += value;
        }
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| (view.index_to_node[idx], score))
        .collect()
}

/// Single-source shortest-path counting and dependency accumulation.
fn accumulate_from_source(view: &GraphView, s: usize, acc: &mut [f64]) {
    let n = view.node_count;
    let mut stack = Vec::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist = vec![-1i64; n];
    let mut queue = VecDeque::new();

    sigma[s] = 1.0;
    dist[s] = 0;
    queue.push_back(s);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for &w in view.successors(v) {
            if dist[w] < 0 {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    while let Some(w) = stack.pop() {
        for &v in &preds[w] {
            delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
        }
        if w != s {
            acc[w] += delta[w];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_view() -> GraphView {
        // 1 -> 2 -> 3 -> 4
        GraphView::from_edges(vec![1, 2, 3, 4], &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)], false)
    }

    #[test]
    fn test_degree_counts_outgoing() {
        let view = GraphView::from_edges(vec![1, 2, 3], &[(0, 1, 1.0), (0, 2, 1.0), (1, 2, 1.0)], false);
        let scores = degree_centrality(&view);
        assert_eq!(scores[&1], 2.0);
        assert_eq!(scores[&2], 1.0);
        assert_eq!(scores[&3], 0.0);
    }

    #[test]
    fn test_degree_uses_weights() {
        let view = GraphView::from_edges(vec![1, 2], &[(0, 1, 0.5), (0, 1, 2.0)], true);
        let scores = degree_centrality(&view);
        assert_eq!(scores[&1], 2.5);
    }

    #[test]
    fn test_betweenness_on_path() {
        let scores = betweenness_centrality(&path_view());
        // Node 2 lies on 1->3 and 1->4; node 3 lies on 1->4 and 2->4.
        assert_eq!(scores[&1], 0.0);
        assert_eq!(scores[&2], 2.0);
        assert_eq!(scores[&3], 2.0);
        assert_eq!(scores[&4], 0.0);
    }

    #[test]
    fn test_betweenness_splits_between_equal_paths() {
        // 1 -> {2,3} -> 4
        let view = GraphView::from_edges(
            vec![1, 2, 3, 4],
            &[(0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0)],
            false,
        );
        let scores = betweenness_centrality(&view);
        assert_eq!(scores[&2], 0.5);
        assert_eq!(scores[&3], 0.5);
    }

    #[test]
    fn test_empty_view() {
        let view = GraphView::from_edges(vec![], &[], false);
        assert!(betweenness_centrality(&view).is_empty());
        assert!(degree_centrality(&view).is_empty());
    }
}
