//! Bagged forest of regression trees

use super::tree::{RegressionTree, TreeParams};
use super::{check_shapes, Features, ModelResult, Regressor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub trees: usize,
    pub tree: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 100,
            tree: TreeParams::default(),
        }
    }
}

/// Mean of independently bootstrapped regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit `params.trees` trees, each on its own bootstrap sample.
    ///
    /// Per-tree seeds are drawn from `seed` up front, so the result does not
    /// depend on how rayon schedules the trees.
    pub fn fit(x: &[Features], y: &[f64], params: &ForestParams, seed: u64) -> ModelResult<Self> {
        check_shapes(x, y)?;
        let mut master = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..params.trees.max(1)).map(|_| master.gen()).collect();
        let n = x.len();

        let trees = seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit_indices(x, y, sample, &params.tree)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn predict(&self, features: &Features) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Features>, Vec<f64>) {
        let x: Vec<Features> = (0..30).map(|i| [(i % 6) as f64, (i / 6) as f64]).collect();
        let y = x.iter().map(|r| if r[0] < 3.0 { 2.0 } else { 8.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = data();
        let params = ForestParams {
            trees: 16,
            ..Default::default()
        };
        let a = RandomForest::fit(&x, &y, &params, 7).unwrap();
        let b = RandomForest::fit(&x, &y, &params, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tree_count(), 16);
    }

    #[test]
    fn test_predictions_stay_in_target_range() {
        let (x, y) = data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default(), 42).unwrap();
        for row in &x {
            let p = forest.predict(row);
            assert!((2.0..=8.0).contains(&p));
        }
        assert!(forest.predict(&[0.0, 0.0]) < forest.predict(&[5.0, 0.0]));
    }
}
