//! Movie catalog: validated person, movie, genre, user and rating mutations
//!
//! All writes are upserts keyed on the entity's unique property and are
//! delegated to a [`GraphBackend`]. Role strings and rating scores are
//! validated here, before anything reaches the graph.

pub mod dataset;
pub mod role;

pub use dataset::{Dataset, DatasetError, MovieRecord, PersonRecord, RatingRecord};
pub use role::{Role, UnknownRole};

use crate::backend::{GraphBackend, WriteQuery};
use crate::config::RatingScale;
use crate::graph::{EdgeType, GraphError, NodeId, NodeKey, PropertyMap, PropertyValue};
use crate::schema;
use thiserror::Error;
use tracing::debug;

/// Catalog errors
#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("Score {score} is outside the rating scale [{min}, {max}]")]
    ScoreOutOfRange { score: f64, min: f64, max: f64 },

    #[error("{0} must not be empty")]
    EmptyKey(&'static str),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result of deleting a single rating
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingDeletion {
    Deleted { score: Option<f64> },
    NotFound,
}

pub fn person_key(name: &str) -> NodeKey {
    NodeKey::new(schema::PERSON, schema::PERSON_KEY, name)
}

pub fn movie_key(title: &str) -> NodeKey {
    NodeKey::new(schema::MOVIE, schema::MOVIE_KEY, title)
}

pub fn genre_key(name: &str) -> NodeKey {
    NodeKey::new(schema::GENRE, schema::GENRE_KEY, name)
}

pub fn user_key(username: &str) -> NodeKey {
    NodeKey::new(schema::USER, schema::USER_KEY, username)
}

fn require(value: &str, what: &'static str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        Err(CatalogError::EmptyKey(what))
    } else {
        Ok(())
    }
}

/// Catalog over a borrowed graph backend
pub struct Catalog<'a, B: GraphBackend + ?Sized> {
    backend: &'a mut B,
    scale: RatingScale,
}

impl<'a, B: GraphBackend + ?Sized> Catalog<'a, B> {
    pub fn new(backend: &'a mut B, scale: RatingScale) -> Self {
        Self { backend, scale }
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    /// Upsert a person; `roles` is recorded on the node, not linked to any movie
    pub fn add_person(
        &mut self,
        name: &str,
        age: Option<u32>,
        gender: Option<&str>,
        roles: &[Role],
    ) -> CatalogResult<NodeId> {
        require(name, "Person name")?;
        let mut props = PropertyMap::new();
        props.insert("age".to_string(), age.into());
        props.insert("gender".to_string(), gender.map(str::to_string).into());
        props.insert(
            "roles".to_string(),
            roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().into(),
        );
        Ok(self.backend.upsert_node(&person_key(name), props)?)
    }

    pub fn add_user(&mut self, username: &str) -> CatalogResult<NodeId> {
        require(username, "Username")?;
        Ok(self.backend.upsert_node(&user_key(username), PropertyMap::new())?)
    }

    /// Upsert a movie and one IN_GENRE relationship per listed genre
    pub fn add_movie(&mut self, title: &str, year: Option<i64>, genres: &[String]) -> CatalogResult<NodeId> {
        require(title, "Movie title")?;
        for genre in genres {
            require(genre, "Genre name")?;
        }

        let mut props = PropertyMap::new();
        props.insert("year".to_string(), year.into());
        props.insert("genres".to_string(), genres.to_vec().into());
        let movie = movie_key(title);
        let id = self.backend.upsert_node(&movie, props)?;

        let in_genre = EdgeType::new(schema::IN_GENRE);
        for genre in genres {
            let key = genre_key(genre);
            self.backend.upsert_node(&key, PropertyMap::new())?;
            self.backend
                .upsert_relationship(&movie, &key, &in_genre, PropertyMap::new())?;
        }
        debug!("Upserted movie {} with {} genres", title, genres.len());
        Ok(id)
    }

    /// Make sure a movie node exists without touching its properties
    pub fn ensure_movie(&mut self, title: &str) -> CatalogResult<NodeId> {
        require(title, "Movie title")?;
        Ok(self.backend.upsert_node(&movie_key(title), PropertyMap::new())?)
    }

    /// Link an existing person to an existing movie once per role
    pub fn link_person_to_movie(&mut self, person: &str, movie: &str, roles: &[Role]) -> CatalogResult<()> {
        let source = person_key(person);
        let target = movie_key(movie);
        for role in roles {
            self.backend
                .upsert_relationship(&source, &target, &role.edge_type(), PropertyMap::new())?;
        }
        Ok(())
    }

    /// Like [`Catalog::link_person_to_movie`], for roles still in string form
    pub fn link_person_to_movie_by_name(&mut self, person: &str, movie: &str, roles: &[&str]) -> CatalogResult<()> {
        let roles = roles.iter().map(|r| r.parse()).collect::<Result<Vec<Role>, _>>()?;
        self.link_person_to_movie(person, movie, &roles)
    }

    /// Set the user's score for a movie, merging both endpoints
    pub fn rate_movie(&mut self, username: &str, title: &str, score: f64) -> CatalogResult<()> {
        if !self.scale.contains(score) {
            return Err(CatalogError::ScoreOutOfRange {
                score,
                min: self.scale.min,
                max: self.scale.max,
            });
        }
        require(username, "Username")?;
        require(title, "Movie title")?;

        let user = user_key(username);
        let movie = movie_key(title);
        self.backend.upsert_node(&user, PropertyMap::new())?;
        self.backend.upsert_node(&movie, PropertyMap::new())?;

        let mut props = PropertyMap::new();
        props.insert(schema::SCORE.to_string(), score.into());
        self.backend
            .upsert_relationship(&user, &movie, &EdgeType::new(schema::RATED), props)?;
        Ok(())
    }

    pub fn delete_person(&mut self, name: &str) -> CatalogResult<bool> {
        Ok(self.backend.delete_node_cascade(&person_key(name))?)
    }

    pub fn delete_user(&mut self, username: &str) -> CatalogResult<bool> {
        Ok(self.backend.delete_node_cascade(&user_key(username))?)
    }

    pub fn delete_movie(&mut self, title: &str) -> CatalogResult<bool> {
        Ok(self.backend.delete_node_cascade(&movie_key(title))?)
    }

    /// Remove a user's rating of a movie, reporting the score it held
    pub fn delete_rating(&mut self, username: &str, title: &str) -> CatalogResult<RatingDeletion> {
        let summary = self.backend.run_write(&WriteQuery::DeleteRelationship {
            source: user_key(username),
            target: movie_key(title),
            edge_type: EdgeType::new(schema::RATED),
        })?;
        if summary.relationships_deleted == 0 {
            return Ok(RatingDeletion::NotFound);
        }
        let score = summary
            .removed
            .as_ref()
            .and_then(|props| props.get(schema::SCORE))
            .and_then(PropertyValue::as_number);
        Ok(RatingDeletion::Deleted { score })
    }

    /// Remove one role relationship; true when it existed
    pub fn delete_person_relationship(&mut self, person: &str, title: &str, role: Role) -> CatalogResult<bool> {
        let summary = self.backend.run_write(&WriteQuery::DeleteRelationship {
            source: person_key(person),
            target: movie_key(title),
            edge_type: role.edge_type(),
        })?;
        Ok(summary.relationships_deleted > 0)
    }

    /// Detach-delete everything, returning the number of nodes removed
    pub fn delete_all(&mut self) -> CatalogResult<usize> {
        Ok(self.backend.run_write(&WriteQuery::DeleteAll)?.nodes_deleted)
    }
}
