//! Roles a person can hold on a movie

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::graph::EdgeType;

/// A person's role on a movie.
///
/// Each role materializes as its own relationship type, so only these
/// variants can ever reach the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Actor,
    Director,
    Producer,
    Writer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Actor, Role::Director, Role::Producer, Role::Writer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Actor => "Actor",
            Role::Director => "Director",
            Role::Producer => "Producer",
            Role::Writer => "Writer",
        }
    }

    /// Relationship type of this role, e.g. `ACTOR`
    pub fn edge_type(&self) -> EdgeType {
        EdgeType::new(self.as_str().to_uppercase())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a role name outside the known set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("actor".parse::<Role>(), Ok(Role::Actor));
        assert_eq!(" DIRECTOR ".parse::<Role>(), Ok(Role::Director));
        assert_eq!("Producer".parse::<Role>(), Ok(Role::Producer));
        assert_eq!("Stunt Double".parse::<Role>(), Err(UnknownRole("Stunt Double".to_string())));
    }

    #[test]
    fn test_edge_type() {
        assert_eq!(Role::Writer.edge_type().as_str(), "WRITER");
        assert_eq!(Role::Actor.edge_type().as_str(), "ACTOR");
    }

    #[test]
    fn test_serde_rejects_unknown() {
        let roles: Vec<Role> = serde_json::from_str("[\"actor\", \"Writer\"]").unwrap();
        assert_eq!(roles, vec![Role::Actor, Role::Writer]);
        assert!(serde_json::from_str::<Vec<Role>>("[\"; DROP\"]").is_err());
        assert_eq!(serde_json::to_string(&Role::Director).unwrap(), "\"Director\"");
    }

    #[test]
    fn test_unknown_role_message() {
        let err = "Gaffer".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unknown role 'Gaffer'");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
