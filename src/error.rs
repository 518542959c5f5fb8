//! Crate-level error type
//!
//! Every module keeps its own error enum; `CinegraphError` wraps them for
//! callers that drive several components and want a single `?` target.

use crate::artifacts::ArtifactError;
use crate::catalog::dataset::DatasetError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::encoder::EncoderError;
use crate::graph::GraphError;
use crate::projection::ProjectionError;
use crate::ratings::ExtractError;
use crate::recommend::RecommendError;
use crate::trainer::TrainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CinegraphError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Training error: {0}")]
    Train(#[from] TrainError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Recommendation error: {0}")]
    Recommend(#[from] RecommendError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

pub type Result<T> = std::result::Result<T, CinegraphError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderKind;

    fn unknown_user() -> std::result::Result<usize, EncoderError> {
        Err(EncoderError::UnknownIdentifier {
            kind: EncoderKind::User,
            identifier: "ghost".to_string(),
        })
    }

    fn lookup() -> Result<usize> {
        Ok(unknown_user()?)
    }

    #[test]
    fn test_question_mark_conversion() {
        let err = lookup().unwrap_err();
        assert!(matches!(err, CinegraphError::Encoder(EncoderError::UnknownIdentifier { .. })));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_projection_errors_keep_their_message() {
        let err: CinegraphError = ProjectionError::NotFound("g".to_string()).into();
        assert_eq!(err.to_string(), "Projection error: Projection 'g' not found");
    }
}
