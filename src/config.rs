//! Configuration for the rating scale, training, artifacts and projections
//!
//! Every field has a default, so an empty YAML document is a valid config.

use crate::models::ModelSpec;
use crate::projection::Orientation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Inclusive bounds of a rating score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl RatingScale {
    pub fn contains(&self, score: f64) -> bool {
        score.is_finite() && score >= self.min && score <= self.max
    }
}

/// Train/test split and model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the split and for every randomized model
    pub seed: u64,
    /// Fewest rating rows training accepts
    pub min_rows: usize,
    /// Models to fit, in reporting order
    pub models: Vec<ModelSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            min_rows: 2,
            models: ModelSpec::reference_set(),
        }
    }
}

/// Where artifact bundles live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub dir: PathBuf,
    pub bundle: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            bundle: "movie-recommender".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub top_n: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

/// The named projection analytics run against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub name: String,
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub orientation: Orientation,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            name: "full-movie-graph".to_string(),
            node_labels: ["Person", "Movie", "Genre", "User"].map(String::from).to_vec(),
            relationship_types: ["ACTOR", "DIRECTOR", "PRODUCER", "WRITER", "IN_GENRE", "RATED"]
                .map(String::from)
                .to_vec(),
            orientation: Orientation::Natural,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rating: RatingScale,
    pub training: TrainingConfig,
    pub artifacts: ArtifactConfig,
    pub recommend: RecommendConfig,
    pub projection: ProjectionConfig,
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.rating.min.is_finite() && self.rating.max.is_finite()) || self.rating.min >= self.rating.max {
            return invalid(format!(
                "rating scale [{}, {}] must be finite with min < max",
                self.rating.min, self.rating.max
            ));
        }
        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return invalid(format!("test_fraction {} must lie in (0, 1)", fraction));
        }
        if self.training.min_rows < 2 {
            return invalid(format!("min_rows {} must be at least 2", self.training.min_rows));
        }
        if self.training.models.is_empty() {
            return invalid("at least one model must be configured".to_string());
        }
        let mut names = HashSet::new();
        for spec in &self.training.models {
            spec.validate().map_err(ConfigError::Invalid)?;
            if !names.insert(spec.name()) {
                return invalid(format!("model {} is configured twice", spec.name()));
            }
        }
        if self.artifacts.bundle.trim().is_empty() {
            return invalid("artifact bundle name must not be empty".to_string());
        }
        if self.projection.name.trim().is_empty() {
            return invalid("projection name must not be empty".to_string());
        }
        if self.projection.node_labels.is_empty() {
            return invalid("projection needs at least one node label".to_string());
        }
        Ok(())
    }
}
