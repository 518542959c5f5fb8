//! CART regression tree
//!
//! Splits minimize the summed squared error of the two children. Nodes live
//! in a flat arena; the root is index 0.

use super::{check_shapes, Features, ModelResult, Regressor, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    error: f64,
}

impl RegressionTree {
    pub fn fit(x: &[Features], y: &[f64], params: &TreeParams) -> ModelResult<Self> {
        check_shapes(x, y)?;
        let indices: Vec<usize> = (0..x.len()).collect();
        Ok(Self::fit_indices(x, y, indices, params))
    }

    /// Fit on a sample of row indices; repeated indices weigh a row more
    pub(crate) fn fit_indices(x: &[Features], y: &[f64], indices: Vec<usize>, params: &TreeParams) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(x, y, indices, 0, params);
        tree
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    fn grow(&mut self, x: &[Features], y: &[f64], indices: Vec<usize>, depth: usize, params: &TreeParams) -> usize {
        let slot = self.nodes.len();
        let value = mean(indices.iter().map(|&i| y[i]));
        self.nodes.push(TreeNode::Leaf { value });

        if depth >= params.max_depth || indices.len() < params.min_samples_split {
            return slot;
        }
        let Some(split) = best_split(x, y, &indices) else {
            return slot;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);
        let left = self.grow(x, y, left_rows, depth + 1, params);
        let right = self.grow(x, y, right_rows, depth + 1, params);
        self.nodes[slot] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }
}

impl Regressor for RegressionTree {
    fn predict(&self, features: &Features) -> f64 {
        let mut slot = 0;
        loop {
            match self.nodes.get(slot) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    slot = if features[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Lowest-error split over all features, or `None` when no split improves
/// on the parent (constant targets or constant features)
fn best_split(x: &[Features], y: &[f64], indices: &[usize]) -> Option<BestSplit> {
    if indices.len() < 2 {
        return None;
    }
    let n = indices.len() as f64;
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_error = total_sq - total_sum * total_sum / n;
    if parent_error <= 1e-12 {
        return None;
    }

    let mut best: Option<BestSplit> = None;
    let mut sorted = indices.to_vec();
    for feature in 0..FEATURE_COUNT {
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 0..sorted.len() - 1 {
            let row = sorted[pos];
            left_sum += y[row];
            left_sq += y[row] * y[row];

            let here = x[row][feature];
            let next = x[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }

            let left_n = (pos + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let error = (left_sq - left_sum * left_sum / left_n) + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().map_or(true, |b| error < b.error) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    error,
                });
            }
        }
    }
    best.filter(|b| b.error < parent_error)
}
