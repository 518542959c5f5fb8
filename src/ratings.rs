//! Rating extraction
//!
//! Snapshots every (user, item, score) triple in the graph into a table.

use crate::backend::{row_str, GraphBackend, ReadQuery};
use crate::graph::{GraphError, PropertyValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    /// A RATED relationship without a numeric score
    #[error("Rating of '{item}' by '{user}' has no score")]
    MissingScore { user: String, item: String },

    #[error("Ratings query returned a row without a {0} column")]
    MalformedRow(&'static str),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// One extracted rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: String,
    pub item: String,
    pub score: f64,
}

impl Rating {
    pub fn new(user: impl Into<String>, item: impl Into<String>, score: f64) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            score,
        }
    }
}

/// Tabular snapshot of ratings. Row order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingTable {
    rows: Vec<Rating>,
}

impl RatingTable {
    pub fn new(rows: Vec<Rating>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Rating] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.user.as_str())
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.item.as_str())
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.score)
    }
}

impl FromIterator<Rating> for RatingTable {
    fn from_iter<I: IntoIterator<Item = Rating>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Reads ratings from a graph backend
pub struct RatingExtractor<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: GraphBackend + ?Sized> RatingExtractor<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Extract every rating; a RATED edge without a numeric score aborts with `MissingScore`
    pub fn extract(&self) -> ExtractResult<RatingTable> {
        let rows = self.backend.run_read(&ReadQuery::Ratings)?;
        let mut ratings = Vec::with_capacity(rows.len());
        for row in &rows {
            let user = row_str(row, "user").ok_or(ExtractError::MalformedRow("user"))?;
            let item = row_str(row, "item").ok_or(ExtractError::MalformedRow("item"))?;
            let score = row
                .get("score")
                .and_then(PropertyValue::as_number)
                .filter(|s| s.is_finite())
                .ok_or_else(|| ExtractError::MissingScore {
                    user: user.to_string(),
                    item: item.to_string(),
                })?;
            ratings.push(Rating::new(user, item, score));
        }
        debug!("Extracted {} ratings", ratings.len());
        Ok(RatingTable::new(ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{movie_key, user_key, Catalog};
    use crate::config::RatingScale;
    use crate::graph::{EdgeType, GraphStore, PropertyMap};

    #[test]
    fn test_empty_graph_gives_empty_table() {
        let store = GraphStore::new();
        let table = RatingExtractor::new(&store).extract().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_extract_triples() {
        let mut store = GraphStore::new();
        let mut catalog = Catalog::new(&mut store, RatingScale::default());
        catalog.rate_movie("u1", "m1", 8.0).unwrap();
        catalog.rate_movie("u2", "m1", 9.0).unwrap();

        let table = RatingExtractor::new(&store).extract().unwrap();
        assert_eq!(table.len(), 2);
        let mut rows = table.rows().to_vec();
        rows.sort_by(|a, b| a.user.cmp(&b.user));
        assert_eq!(rows[0], Rating::new("u1", "m1", 8.0));
        assert_eq!(rows[1], Rating::new("u2", "m1", 9.0));
    }

    #[test]
    fn test_missing_score_fails_loudly() {
        let mut store = GraphStore::new();
        store.upsert_node(&user_key("u1"), PropertyMap::new()).unwrap();
        store.upsert_node(&movie_key("m1"), PropertyMap::new()).unwrap();
        store
            .upsert_relationship(&user_key("u1"), &movie_key("m1"), &EdgeType::new("RATED"), PropertyMap::new())
            .unwrap();

        let err = RatingExtractor::new(&store).extract().unwrap_err();
        assert_eq!(
            err,
            ExtractError::MissingScore {
                user: "u1".into(),
                item: "m1".into()
            }
        );
    }
}
