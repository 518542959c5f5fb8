//! Ridge regression
//!
//! Solves `(XᵀX + αI) w = Xᵀy` on centered data, so the intercept is not
//! penalized.

use super::{check_shapes, Features, ModelError, ModelResult, Regressor, FEATURE_COUNT};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ridge {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl Ridge {
    pub fn fit(x: &[Features], y: &[f64], alpha: f64) -> ModelResult<Self> {
        check_shapes(x, y)?;
        let n = x.len() as f64;

        let features = Array2::from_shape_fn((x.len(), FEATURE_COUNT), |(i, j)| x[i][j]);
        let targets = Array1::from_vec(y.to_vec());
        let x_mean = features.sum_axis(ndarray::Axis(0)) / n;
        let y_mean = targets.sum() / n;

        let centered = &features - &x_mean;
        let centered_y = &targets - y_mean;

        let mut gram = centered.t().dot(&centered);
        for d in 0..FEATURE_COUNT {
            gram[[d, d]] += alpha;
        }
        let rhs = centered.t().dot(&centered_y);

        let weights = solve(gram, rhs)?;
        let intercept = y_mean - weights.dot(&x_mean);
        Ok(Self {
            coefficients: weights.to_vec(),
            intercept,
        })
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for Ridge {
    fn predict(&self, features: &Features) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting.
///
/// Zero columns (a feature constant over the training set with `alpha = 0`)
/// get a zero weight instead of failing.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> ModelResult<Array1<f64>> {
    let n = b.len();
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    let eps = 1e-12 * scale;
    let mut pivoted = vec![false; n];

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= eps {
            continue;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        pivoted[col] = true;
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = Array1::zeros(n);
    for row in (0..n).rev() {
        if !pivoted[row] {
            if b[row].abs() > eps {
                return Err(ModelError::Singular);
            }
            continue;
        }
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * w[k]).sum();
        w[row] = (b[row] - tail) / a[[row, row]];
    }
    if w.iter().any(|v: &f64| !v.is_finite()) {
        return Err(ModelError::Singular);
    }
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregularized_fit_recovers_plane() {
        let x: Vec<Features> = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 3.0]];
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 1.0).collect();
        let model = Ridge::fit(&x, &y, 0.0).unwrap();

        assert!((model.coefficients()[0] - 3.0).abs() < 1e-9);
        assert!((model.coefficients()[1] + 2.0).abs() < 1e-9);
        assert!((model.intercept() - 1.0).abs() < 1e-9);
        assert!((model.predict(&[4.0, 4.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_shrinks_weights() {
        let x: Vec<Features> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();
        let loose = Ridge::fit(&x, &y, 0.0).unwrap();
        let tight = Ridge::fit(&x, &y, 100.0).unwrap();
        assert!(tight.coefficients()[0].abs() < loose.coefficients()[0].abs());
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x: Vec<Features> = vec![[0.0, 5.0], [1.0, 5.0], [2.0, 5.0]];
        let y = vec![1.0, 3.0, 5.0];
        let model = Ridge::fit(&x, &y, 0.0).unwrap();
        assert_eq!(model.coefficients()[1], 0.0);
        assert!((model.predict(&[3.0, 5.0]) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_row_predicts_its_target() {
        let model = Ridge::fit(&[[1.0, 2.0]], &[6.0], 1.0).unwrap();
        assert!((model.predict(&[9.0, 9.0]) - 6.0).abs() < 1e-12);
    }
}
