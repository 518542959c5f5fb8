//! Labels, key properties and relationship types of the movie graph

pub const PERSON: &str = "Person";
pub const MOVIE: &str = "Movie";
pub const GENRE: &str = "Genre";
pub const USER: &str = "User";

pub const PERSON_KEY: &str = "name";
pub const MOVIE_KEY: &str = "title";
pub const GENRE_KEY: &str = "name";
pub const USER_KEY: &str = "username";

pub const RATED: &str = "RATED";
pub const IN_GENRE: &str = "IN_GENRE";

/// Property holding the score of a RATED relationship
pub const SCORE: &str = "score";
