//! Extract, train and persist in one call
//!
//! `Pipeline` ties the rating extractor, trainer and artifact store together
//! under one [`Config`]. The graph backend is passed in by the caller on
//! every call.

use crate::artifacts::{ArtifactBundle, ArtifactError, ArtifactStore};
use crate::backend::GraphBackend;
use crate::config::Config;
use crate::error::Result;
use crate::ratings::RatingExtractor;
use crate::recommend::{ModelRecommendations, Recommender};
use crate::trainer::Trainer;
use tracing::{info, warn};

pub struct Pipeline {
    config: Config,
    store: ArtifactStore,
}

impl Pipeline {
    /// Pipeline writing bundles under `config.artifacts.dir`
    pub fn new(config: Config) -> Self {
        let store = ArtifactStore::new(config.artifacts.dir.clone());
        Self { config, store }
    }

    pub fn with_store(config: Config, store: ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn bundle_name(&self) -> &str {
        &self.config.artifacts.bundle
    }

    /// Train on every rating currently in the graph and persist the bundle
    pub fn train_and_save<B: GraphBackend + ?Sized>(&self, backend: &B) -> Result<ArtifactBundle> {
        let table = RatingExtractor::new(backend).extract()?;
        let run = Trainer::new(self.config.training.clone()).train(&table)?;
        let bundle = ArtifactBundle::from_run(self.bundle_name(), run);
        self.store.save(&bundle)?;
        Ok(bundle)
    }

    /// Load the configured bundle
    pub fn load(&self) -> Result<ArtifactBundle> {
        Ok(self.store.load(self.bundle_name())?)
    }

    /// Load the configured bundle, retraining when it is missing or inconsistent
    pub fn load_or_train<B: GraphBackend + ?Sized>(&self, backend: &B) -> Result<ArtifactBundle> {
        match self.store.load(self.bundle_name()) {
            Ok(bundle) => Ok(bundle),
            Err(ArtifactError::Unavailable { bundle, reason }) => {
                warn!("Artifact bundle '{}' unavailable ({}), retraining", bundle, reason);
                self.train_and_save(backend)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ranked lists from every model, `recommend.top_n` items each
    pub fn recommend<B: GraphBackend + ?Sized>(
        &self,
        backend: &B,
        bundle: &ArtifactBundle,
        user: &str,
    ) -> Result<Vec<ModelRecommendations>> {
        let lists = Recommender::new(backend, bundle).recommend_all(user, self.config.recommend.top_n)?;
        info!("Recommended for {} with {} models", user, lists.len());
        Ok(lists)
    }
}
