//! Bulk catalog loading from YAML or JSON documents

use super::{Catalog, CatalogError, Role};
use crate::backend::GraphBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML dataset: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Movies the person worked on, linked once per role
    #[serde(default)]
    pub movies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user: String,
    pub movie: String,
    pub score: f64,
}

/// A catalog snapshot: persons, movies, users and ratings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub persons: Vec<PersonRecord>,
    pub movies: Vec<MovieRecord>,
    pub users: Vec<String>,
    pub ratings: Vec<RatingRecord>,
}

impl Dataset {
    pub fn from_yaml_str(text: &str) -> DatasetResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> DatasetResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a dataset file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> DatasetResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Upsert every record through the catalog.
    ///
    /// Movies go first so person credits can link to them.
    pub fn apply<B: GraphBackend + ?Sized>(&self, catalog: &mut Catalog<'_, B>) -> DatasetResult<()> {
        for movie in &self.movies {
            catalog.add_movie(&movie.title, movie.year, &movie.genres)?;
        }
        for person in &self.persons {
            catalog.add_person(&person.name, person.age, person.gender.as_deref(), &person.roles)?;
            for title in &person.movies {
                catalog.ensure_movie(title)?;
                catalog.link_person_to_movie(&person.name, title, &person.roles)?;
            }
        }
        for user in &self.users {
            catalog.add_user(user)?;
        }
        for rating in &self.ratings {
            catalog.rate_movie(&rating.user, &rating.movie, rating.score)?;
        }
        info!(
            "Loaded dataset: {} movies, {} persons, {} users, {} ratings",
            self.movies.len(),
            self.persons.len(),
            self.users.len(),
            self.ratings.len()
        );
        Ok(())
    }
}
