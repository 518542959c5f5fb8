//! k-nearest-neighbour regression with uniform weights

use super::{check_shapes, Features, ModelResult, Regressor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knn {
    k: usize,
    rows: Vec<Features>,
    targets: Vec<f64>,
}

impl Knn {
    /// Store the training set. `k` is clamped to the number of rows.
    pub fn fit(x: &[Features], y: &[f64], k: usize) -> ModelResult<Self> {
        check_shapes(x, y)?;
        Ok(Self {
            k: k.clamp(1, x.len()),
            rows: x.to_vec(),
            targets: y.to_vec(),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

fn squared_distance(a: &Features, b: &Features) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

impl Regressor for Knn {
    /// Mean target of the `k` closest rows; equal distances resolve to the earlier row
    fn predict(&self, features: &Features) -> f64 {
        let mut ranked: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (squared_distance(row, features), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let neighbours = &ranked[..self.k.min(ranked.len())];
        if neighbours.is_empty() {
            return 0.0;
        }
        neighbours.iter().map(|&(_, i)| self.targets[i]).sum::<f64>() / neighbours.len() as f64
    }
}
