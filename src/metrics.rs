//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};

/// Error metrics of one model on the evaluation partition.
///
/// Serialized with the record keys `Model`, `MSE`, `MAE` and `R2`. `R2` is
/// null when the partition has fewer than two rows or constant targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "R2")]
    pub r2: Option<f64>,
}

impl ModelMetrics {
    /// Compare predictions against actual targets; `None` for empty or mismatched input
    pub fn compute(model: impl Into<String>, actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }
        let n = actual.len() as f64;
        let (sq, abs) = actual
            .iter()
            .zip(predicted)
            .fold((0.0, 0.0), |(sq, abs), (a, p)| {
                let err = a - p;
                (sq + err * err, abs + err.abs())
            });

        let r2 = if actual.len() < 2 {
            None
        } else {
            let mean = actual.iter().sum::<f64>() / n;
            let total: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
            (total > 0.0).then(|| 1.0 - sq / total)
        };

        Some(Self {
            model: model.into(),
            mse: sq / n,
            mae: abs / n,
            r2,
        })
    }
}
