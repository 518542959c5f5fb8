//! Model training and held-out evaluation
//!
//! Ratings are encoded, sorted into a canonical order, split with a seeded
//! shuffle, and every configured model is fitted on the training partition
//! and scored on the evaluation partition.

use crate::config::TrainingConfig;
use crate::encoder::{EncoderError, ItemEncoder, UserEncoder};
use crate::metrics::ModelMetrics;
use crate::models::{Features, ModelError, ModelSpec, RegressionModel, Regressor};
use crate::ratings::RatingTable;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error("Insufficient data: {rows} rows, {detail}")]
    InsufficientData { rows: usize, detail: String },

    #[error("Invalid model set: {0}")]
    InvalidModels(String),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Model {model} failed to fit: {source}")]
    Model {
        model: String,
        #[source]
        source: ModelError,
    },
}

pub type TrainResult<T> = Result<T, TrainError>;

/// Vocabulary a model was fitted against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDomain {
    pub user_vocab_size: usize,
    pub item_vocab_size: usize,
    pub user_checksum: String,
    pub item_checksum: String,
}

impl FeatureDomain {
    pub fn of(users: &UserEncoder, items: &ItemEncoder) -> Self {
        Self {
            user_vocab_size: users.len(),
            item_vocab_size: items.len(),
            user_checksum: users.checksum(),
            item_checksum: items.checksum(),
        }
    }

    /// True when both encoders are exactly the ones this domain was built from
    pub fn matches(&self, users: &UserEncoder, items: &ItemEncoder) -> bool {
        *self == Self::of(users, items)
    }
}

/// A fitted model with the feature domain it expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub name: String,
    pub model: RegressionModel,
    pub domain: FeatureDomain,
}

impl TrainedModel {
    pub fn predict(&self, features: &Features) -> f64 {
        self.model.predict(features)
    }
}

/// Ratings encoded into model inputs
#[derive(Debug, Clone)]
pub struct EncodedRatings {
    pub users: UserEncoder,
    pub items: ItemEncoder,
    pub features: Vec<Features>,
    pub targets: Vec<f64>,
}

impl EncodedRatings {
    /// Fit both encoders on the table and encode every row in canonical
    /// (user, item) order
    pub fn encode(table: &RatingTable) -> TrainResult<Self> {
        let users = UserEncoder::fit(table.users());
        let items = ItemEncoder::fit(table.items());

        let mut rows: Vec<(usize, usize, f64)> = table
            .rows()
            .iter()
            .map(|r| -> Result<_, EncoderError> { Ok((users.encode(&r.user)?, items.encode(&r.item)?, r.score)) })
            .collect::<Result<_, EncoderError>>()?;
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)).then(a.2.total_cmp(&b.2)));

        Ok(Self {
            users,
            items,
            features: rows.iter().map(|&(u, i, _)| [u as f64, i as f64]).collect(),
            targets: rows.iter().map(|&(_, _, s)| s).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Row indices of the two partitions, each ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

impl Split {
    /// Seeded shuffle of `0..rows`; the evaluation partition takes
    /// `ceil(rows * test_fraction)` rows, and both partitions keep at least one
    pub fn new(rows: usize, test_fraction: f64, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let wanted = (rows as f64 * test_fraction).ceil() as usize;
        let eval_len = if rows < 2 { 0 } else { wanted.clamp(1, rows - 1) };

        let mut eval = order[..eval_len].to_vec();
        let mut train = order[eval_len..].to_vec();
        eval.sort_unstable();
        train.sort_unstable();
        Self { train, eval }
    }
}

/// Everything one training run produced
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub users: UserEncoder,
    pub items: ItemEncoder,
    pub models: Vec<TrainedModel>,
    pub metrics: Vec<ModelMetrics>,
    pub split: Split,
}

impl TrainingRun {
    pub fn model(&self, name: &str) -> Option<&TrainedModel> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Fits and evaluates the configured models
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn train(&self, table: &RatingTable) -> TrainResult<TrainingRun> {
        self.check_models()?;
        let required = self.config.min_rows.max(2);
        if table.len() < required {
            return Err(TrainError::InsufficientData {
                rows: table.len(),
                detail: format!("at least {} required", required),
            });
        }
        let first = table.scores().next().unwrap_or_default();
        if table.scores().all(|s| s == first) {
            return Err(TrainError::InsufficientData {
                rows: table.len(),
                detail: "all targets are equal".to_string(),
            });
        }

        let encoded = EncodedRatings::encode(table)?;
        let split = Split::new(encoded.len(), self.config.test_fraction, self.config.seed);
        info!(
            "Training {} models on {} rows ({} train / {} eval, seed {})",
            self.config.models.len(),
            encoded.len(),
            split.train.len(),
            split.eval.len(),
            self.config.seed
        );

        let train_x: Vec<Features> = split.train.iter().map(|&i| encoded.features[i]).collect();
        let train_y: Vec<f64> = split.train.iter().map(|&i| encoded.targets[i]).collect();
        let eval_x: Vec<Features> = split.eval.iter().map(|&i| encoded.features[i]).collect();
        let eval_y: Vec<f64> = split.eval.iter().map(|&i| encoded.targets[i]).collect();

        let domain = FeatureDomain::of(&encoded.users, &encoded.items);
        let seed = self.config.seed;

        let fitted: Vec<(TrainedModel, ModelMetrics)> = self
            .config
            .models
            .par_iter()
            .map(|spec| -> TrainResult<(TrainedModel, ModelMetrics)> {
                let start = Instant::now();
                let model = fit_one(spec, &train_x, &train_y, seed)?;
                let predictions = model.predict_many(&eval_x);
                let metrics = ModelMetrics::compute(spec.name(), &eval_y, &predictions).ok_or_else(|| {
                    TrainError::InsufficientData {
                        rows: eval_y.len(),
                        detail: "evaluation partition is empty".to_string(),
                    }
                })?;
                debug!("Fitted {} in {:?}", spec.name(), start.elapsed());
                Ok((
                    TrainedModel {
                        name: spec.name().to_string(),
                        model,
                        domain: domain.clone(),
                    },
                    metrics,
                ))
            })
            .collect::<TrainResult<_>>()?;

        let (models, metrics): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        for m in &metrics {
            info!(
                "{}: MSE={:.4} MAE={:.4} R2={}",
                m.model,
                m.mse,
                m.mae,
                m.r2.map_or_else(|| "undefined".to_string(), |r| format!("{:.4}", r))
            );
        }

        Ok(TrainingRun {
            users: encoded.users,
            items: encoded.items,
            models,
            metrics,
            split,
        })
    }

    /// Model names key the artifact files, so each may appear once
    fn check_models(&self) -> TrainResult<()> {
        if self.config.models.is_empty() {
            return Err(TrainError::InvalidModels("no models configured".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in &self.config.models {
            if !seen.insert(spec.name()) {
                return Err(TrainError::InvalidModels(format!(
                    "model {} is configured twice",
                    spec.name()
                )));
            }
        }
        Ok(())
    }
}

fn fit_one(spec: &ModelSpec, x: &[Features], y: &[f64], seed: u64) -> TrainResult<RegressionModel> {
    spec.fit(x, y, seed).map_err(|source| TrainError::Model {
        model: spec.name().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratings::Rating;

    fn scenario() -> RatingTable {
        RatingTable::new(vec![
            Rating::new("u1", "m1", 8.0),
            Rating::new("u1", "m2", 3.0),
            Rating::new("u2", "m1", 9.0),
            Rating::new("u2", "m3", 5.0),
        ])
    }

    #[test]
    fn test_split_sizes() {
        let split = Split::new(4, 0.2, 42);
        assert_eq!(split.train.len(), 3);
        assert_eq!(split.eval.len(), 1);

        let split = Split::new(10, 0.2, 42);
        assert_eq!((split.train.len(), split.eval.len()), (8, 2));

        let split = Split::new(2, 0.9, 1);
        assert_eq!((split.train.len(), split.eval.len()), (1, 1));
    }

    #[test]
    fn test_split_is_reproducible_and_disjoint() {
        let a = Split::new(50, 0.2, 7);
        let b = Split::new(50, 0.2, 7);
        assert_eq!(a, b);
        let mut all: Vec<usize> = a.train.iter().chain(&a.eval).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_encoding_ignores_row_order() {
        let table = scenario();
        let mut reversed = table.rows().to_vec();
        reversed.reverse();
        let a = EncodedRatings::encode(&table).unwrap();
        let b = EncodedRatings::encode(&RatingTable::new(reversed)).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.targets, b.targets);
        assert_eq!(a.features[0], [0.0, 0.0]);
    }

    #[test]
    fn test_train_scenario() {
        let trainer = Trainer::new(TrainingConfig::default());
        let run = trainer.train(&scenario()).unwrap();

        assert_eq!(run.models.len(), 3);
        assert_eq!(run.metrics.len(), 3);
        assert_eq!(run.split.train.len(), 3);
        assert_eq!(run.split.eval.len(), 1);
        assert_eq!(run.users.classes(), &["u1", "u2"]);
        assert_eq!(run.items.classes(), &["m1", "m2", "m3"]);
        // A single evaluation row leaves R2 undefined
        assert!(run.metrics.iter().all(|m| m.r2.is_none()));
        assert!(run.model("KNN").is_some());

        let again = trainer.train(&scenario()).unwrap();
        assert_eq!(run.split, again.split);
        assert_eq!(run.metrics, again.metrics);
    }

    #[test]
    fn test_insufficient_data() {
        let trainer = Trainer::new(TrainingConfig::default());
        let err = trainer.train(&RatingTable::default()).unwrap_err();
        assert!(matches!(err, TrainError::InsufficientData { rows: 0, .. }));

        let one = RatingTable::new(vec![Rating::new("u1", "m1", 8.0)]);
        assert!(matches!(trainer.train(&one), Err(TrainError::InsufficientData { rows: 1, .. })));

        let flat = RatingTable::new(vec![Rating::new("u1", "m1", 8.0), Rating::new("u2", "m1", 8.0)]);
        assert!(matches!(trainer.train(&flat), Err(TrainError::InsufficientData { rows: 2, .. })));
    }

    #[test]
    fn test_duplicate_model_names_are_rejected() {
        let config = TrainingConfig {
            models: vec![ModelSpec::Ridge { alpha: 1.0 }, ModelSpec::Ridge { alpha: 5.0 }],
            ..Default::default()
        };
        let err = Trainer::new(config).train(&scenario()).unwrap_err();
        assert!(matches!(err, TrainError::InvalidModels(_)));

        let none = TrainingConfig {
            models: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            Trainer::new(none).train(&scenario()),
            Err(TrainError::InvalidModels(_))
        ));
    }

    #[test]
    fn test_feature_domain_matches() {
        let users = UserEncoder::fit(["u1", "u2"]);
        let items = ItemEncoder::fit(["m1"]);
        let domain = FeatureDomain::of(&users, &items);
        assert!(domain.matches(&users, &items));
        assert!(!domain.matches(&UserEncoder::fit(["u1"]), &items));
    }
}
