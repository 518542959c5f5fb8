//! Top-N recommendation from a loaded artifact bundle
//!
//! Candidates are the items of the fitted vocabulary that the user has not
//! rated in the live graph. Items added to the graph after the fit are never
//! candidates, and users unseen at fit time are rejected.

use crate::artifacts::{ArtifactBundle, ArtifactError};
use crate::backend::{row_str, GraphBackend, ReadQuery};
use crate::encoder::EncoderError;
use crate::graph::GraphError;
use crate::trainer::TrainedModel;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Model {0} was not fitted against the bundle's encoders")]
    DomainMismatch(String),
}

pub type RecommendResult<T> = Result<T, RecommendError>;

/// One ranked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item: String,
    pub score: f64,
}

/// Ranked lists from every model in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecommendations {
    pub model: String,
    pub items: Vec<Recommendation>,
}

pub struct Recommender<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
    bundle: &'a ArtifactBundle,
}

impl<'a, B: GraphBackend + ?Sized> Recommender<'a, B> {
    pub fn new(backend: &'a B, bundle: &'a ArtifactBundle) -> Self {
        Self { backend, bundle }
    }

    fn checked_model(&self, name: &str) -> RecommendResult<&'a TrainedModel> {
        let model = self.bundle.model(name)?;
        if !model.domain.matches(&self.bundle.users, &self.bundle.items) {
            return Err(RecommendError::DomainMismatch(model.name.clone()));
        }
        Ok(model)
    }

    /// Predicted score of one (user, item) pair
    pub fn predict(&self, user: &str, item: &str, model: &str) -> RecommendResult<f64> {
        let model = self.checked_model(model)?;
        let u = self.bundle.users.encode(user)?;
        let i = self.bundle.items.encode(item)?;
        Ok(model.predict(&[u as f64, i as f64]))
    }

    /// Up to `top_n` unrated items, best predicted score first; equal
    /// scores are ordered by item identifier
    pub fn recommend(&self, user: &str, model: &str, top_n: usize) -> RecommendResult<Vec<Recommendation>> {
        let model = self.checked_model(model)?;
        let user_index = self.bundle.users.encode(user)?;
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let rated: HashSet<String> = self
            .backend
            .run_read(&ReadQuery::RatedItems {
                username: user.to_string(),
            })?
            .iter()
            .filter_map(|row| row_str(row, "item").map(str::to_string))
            .collect();

        let mut ranked: Vec<Recommendation> = self
            .bundle
            .items
            .classes()
            .iter()
            .enumerate()
            .filter(|(_, item)| !rated.contains(item.as_str()))
            .map(|(index, item)| Recommendation {
                item: item.clone(),
                score: model.predict(&[user_index as f64, index as f64]),
            })
            .collect();
        debug!(
            "Scored {} candidates for {} with {} ({} already rated)",
            ranked.len(),
            user,
            model.name,
            rated.len()
        );

        ranked.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.item.cmp(&b.item),
            other => other,
        });
        ranked.truncate(top_n);
        Ok(ranked)
    }

    /// `recommend` with every model of the bundle, in bundle order
    pub fn recommend_all(&self, user: &str, top_n: usize) -> RecommendResult<Vec<ModelRecommendations>> {
        self.bundle
            .models
            .iter()
            .map(|m| -> RecommendResult<ModelRecommendations> {
                Ok(ModelRecommendations {
                    model: m.name.clone(),
                    items: self.recommend(user, &m.name, top_n)?,
                })
            })
            .collect()
    }
}
