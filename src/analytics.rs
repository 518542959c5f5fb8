//! Summary queries over the movie graph
//!
//! Everything here is answered through [`GraphBackend::run_read`], so the
//! summaries work against any backend that implements the canned reads.

use crate::backend::{row_number, row_str, GraphBackend, ReadQuery, Row};
use crate::graph::GraphResult;
use crate::schema;
use serde::{Deserialize, Serialize};

/// Headline counts of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub movies: usize,
    pub persons: usize,
    pub users: usize,
    pub genres: usize,
    pub ratings: usize,
    /// `None` when nothing has been rated
    pub average_rating: Option<f64>,
    pub relationships: usize,
}

/// Degree of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDegree {
    pub label: String,
    pub name: String,
    pub outgoing: usize,
    pub incoming: usize,
    pub degree: usize,
}

/// A label or relationship type with its count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub name: String,
    pub count: usize,
}

/// Node matched by a text search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: String,
    pub name: String,
}

fn count_of(row: &Row, column: &str) -> usize {
    row_number(row, column).map_or(0, |n| n.max(0.0) as usize)
}

fn text_of(row: &Row, column: &str) -> String {
    row_str(row, column).unwrap_or_default().to_string()
}

pub struct Analytics<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: GraphBackend + ?Sized> Analytics<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub fn statistics(&self) -> GraphResult<GraphStatistics> {
        let labels = self.label_distribution()?;
        let label_count = |label: &str| labels.iter().find(|c| c.name == label).map_or(0, |c| c.count);

        let scores: Vec<f64> = self
            .backend
            .run_read(&ReadQuery::Ratings)?
            .iter()
            .filter_map(|row| row_number(row, "score"))
            .collect();
        let average_rating = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        let relationships = self.relationship_distribution()?.iter().map(|c| c.count).sum();

        Ok(GraphStatistics {
            movies: label_count(schema::MOVIE),
            persons: label_count(schema::PERSON),
            users: label_count(schema::USER),
            genres: label_count(schema::GENRE),
            ratings: scores.len(),
            average_rating,
            relationships,
        })
    }

    /// Every node with its degree, highest total degree first
    pub fn degree_distribution(&self) -> GraphResult<Vec<NodeDegree>> {
        let mut degrees: Vec<NodeDegree> = self
            .backend
            .run_read(&ReadQuery::NodeDegrees)?
            .iter()
            .map(|row| NodeDegree {
                label: text_of(row, "label"),
                name: text_of(row, "name"),
                outgoing: count_of(row, "outgoing"),
                incoming: count_of(row, "incoming"),
                degree: count_of(row, "degree"),
            })
            .collect();
        degrees.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.name.cmp(&b.name)));
        Ok(degrees)
    }

    /// Nodes with the most outgoing relationships
    pub fn top_connected(&self, limit: usize) -> GraphResult<Vec<NodeDegree>> {
        let mut degrees = self.degree_distribution()?;
        degrees.sort_by(|a, b| b.outgoing.cmp(&a.outgoing).then_with(|| a.name.cmp(&b.name)));
        degrees.truncate(limit);
        Ok(degrees)
    }

    pub fn label_distribution(&self) -> GraphResult<Vec<Count>> {
        self.counts(&ReadQuery::LabelCounts, "label")
    }

    pub fn relationship_distribution(&self) -> GraphResult<Vec<Count>> {
        self.counts(&ReadQuery::RelationshipCounts, "type")
    }

    pub fn search(&self, term: &str, limit: usize) -> GraphResult<Vec<SearchHit>> {
        Ok(self
            .backend
            .run_read(&ReadQuery::Search {
                term: term.to_string(),
                limit,
            })?
            .iter()
            .map(|row| SearchHit {
                label: text_of(row, "label"),
                name: text_of(row, "name"),
            })
            .collect())
    }

    fn counts(&self, query: &ReadQuery, column: &str) -> GraphResult<Vec<Count>> {
        let mut counts: Vec<Count> = self
            .backend
            .run_read(query)?
            .iter()
            .map(|row| Count {
                name: text_of(row, column),
                count: count_of(row, "count"),
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(counts)
    }
}
