//! Regression models over (encoded user, encoded item) features
//!
//! Three model families are available: a bagged forest of regression trees,
//! closed-form ridge regression and k-nearest-neighbour averaging. Each is
//! fitted and evaluated on its own; nothing combines their outputs.

pub mod forest;
pub mod knn;
pub mod ridge;
pub mod tree;

pub use forest::{ForestParams, RandomForest};
pub use knn::Knn;
pub use ridge::Ridge;
pub use tree::{RegressionTree, TreeParams};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of input features: encoded user id, encoded item id
pub const FEATURE_COUNT: usize = 2;

/// One input row
pub type Features = [f64; FEATURE_COUNT];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Cannot fit a model on an empty training set")]
    EmptyTrainingSet,

    #[error("Feature rows ({rows}) and targets ({targets}) differ in length")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Normal equations are singular")]
    Singular,
}

pub type ModelResult<T> = Result<T, ModelError>;

pub(crate) fn check_shapes(x: &[Features], y: &[f64]) -> ModelResult<()> {
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.len(),
            targets: y.len(),
        });
    }
    if x.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    Ok(())
}

/// A fitted model that maps one feature row to a score
pub trait Regressor {
    fn predict(&self, features: &Features) -> f64;

    fn predict_many(&self, rows: &[Features]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

fn default_trees() -> usize {
    100
}

fn default_max_depth() -> usize {
    10
}

fn default_min_samples_split() -> usize {
    2
}

fn default_alpha() -> f64 {
    1.0
}

fn default_k() -> usize {
    5
}

/// A model to train, with its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest {
        #[serde(default = "default_trees")]
        trees: usize,
        #[serde(default = "default_max_depth")]
        max_depth: usize,
        #[serde(default = "default_min_samples_split")]
        min_samples_split: usize,
    },
    Ridge {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    Knn {
        #[serde(default = "default_k")]
        k: usize,
    },
}

impl ModelSpec {
    /// Ensemble tree, regularized linear and neighbour-based regressors
    pub fn reference_set() -> Vec<ModelSpec> {
        vec![
            ModelSpec::RandomForest {
                trees: default_trees(),
                max_depth: default_max_depth(),
                min_samples_split: default_min_samples_split(),
            },
            ModelSpec::Ridge { alpha: default_alpha() },
            ModelSpec::Knn { k: default_k() },
        ]
    }

    /// Stable model name, used for artifact files and metric records
    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::RandomForest { .. } => "RandomForest",
            ModelSpec::Ridge { .. } => "Ridge",
            ModelSpec::Knn { .. } => "KNN",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ModelSpec::RandomForest {
                trees,
                max_depth,
                min_samples_split,
            } => {
                if trees == 0 || max_depth == 0 {
                    return Err("RandomForest needs at least one tree of depth 1".to_string());
                }
                if min_samples_split < 2 {
                    return Err("RandomForest min_samples_split must be at least 2".to_string());
                }
            }
            ModelSpec::Ridge { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(format!("Ridge alpha {} must be finite and non-negative", alpha));
                }
            }
            ModelSpec::Knn { k } => {
                if k == 0 {
                    return Err("KNN k must be at least 1".to_string());
                }
            }
        }
        Ok(())
    }

    /// Fit this model; `seed` drives every random choice
    pub fn fit(&self, x: &[Features], y: &[f64], seed: u64) -> ModelResult<RegressionModel> {
        let model = match *self {
            ModelSpec::RandomForest {
                trees,
                max_depth,
                min_samples_split,
            } => {
                let params = ForestParams {
                    trees,
                    tree: TreeParams {
                        max_depth,
                        min_samples_split,
                    },
                };
                RegressionModel::RandomForest(RandomForest::fit(x, y, &params, seed)?)
            }
            ModelSpec::Ridge { alpha } => RegressionModel::Ridge(Ridge::fit(x, y, alpha)?),
            ModelSpec::Knn { k } => RegressionModel::Knn(Knn::fit(x, y, k)?),
        };
        Ok(model)
    }
}

/// A fitted model of any supported family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionModel {
    RandomForest(RandomForest),
    Ridge(Ridge),
    Knn(Knn),
}

impl RegressionModel {
    pub fn name(&self) -> &'static str {
        match self {
            RegressionModel::RandomForest(_) => "RandomForest",
            RegressionModel::Ridge(_) => "Ridge",
            RegressionModel::Knn(_) => "KNN",
        }
    }
}

impl Regressor for RegressionModel {
    fn predict(&self, features: &Features) -> f64 {
        match self {
            RegressionModel::RandomForest(m) => m.predict(features),
            RegressionModel::Ridge(m) => m.predict(features),
            RegressionModel::Knn(m) => m.predict(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Features>, Vec<f64>) {
        let x: Vec<Features> = (0..20).map(|i| [i as f64, (i % 4) as f64]).collect();
        let y = x.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        (x, y)
    }

    #[test]
    fn test_reference_set_names() {
        let names: Vec<_> = ModelSpec::reference_set().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["RandomForest", "Ridge", "KNN"]);
    }

    #[test]
    fn test_fit_each_spec() {
        let (x, y) = line();
        for spec in ModelSpec::reference_set() {
            let model = spec.fit(&x, &y, 42).unwrap();
            assert_eq!(model.name(), spec.name());
            let predictions = model.predict_many(&x);
            assert_eq!(predictions.len(), x.len());
            assert!(predictions.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_shape_errors() {
        let spec = ModelSpec::Ridge { alpha: 1.0 };
        assert_eq!(spec.fit(&[], &[], 0), Err(ModelError::EmptyTrainingSet));
        assert_eq!(
            spec.fit(&[[0.0, 0.0]], &[1.0, 2.0], 0),
            Err(ModelError::LengthMismatch { rows: 1, targets: 2 })
        );
    }

    #[test]
    fn test_spec_validation() {
        assert!(ModelSpec::Knn { k: 0 }.validate().is_err());
        assert!(ModelSpec::Ridge { alpha: -1.0 }.validate().is_err());
        assert!(ModelSpec::RandomForest {
            trees: 10,
            max_depth: 3,
            min_samples_split: 1
        }
        .validate()
        .is_err());
        assert!(ModelSpec::reference_set().iter().all(|s| s.validate().is_ok()));
    }

    #[test]
    fn test_spec_yaml_defaults() {
        let spec: ModelSpec = serde_yaml::from_str("kind: random_forest\ntrees: 5\n").unwrap();
        assert_eq!(
            spec,
            ModelSpec::RandomForest {
                trees: 5,
                max_depth: 10,
                min_samples_split: 2
            }
        );
    }
}
