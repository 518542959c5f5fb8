//! Identifier encoders
//!
//! Bidirectional maps between opaque string identifiers and dense indices.
//! Indices follow the sorted order of the distinct identifiers, so the same
//! vocabulary always produces the same mapping. User and item encoders are
//! distinct types and cannot be swapped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncoderError {
    #[error("Unknown {kind} identifier '{identifier}'")]
    UnknownIdentifier { kind: EncoderKind, identifier: String },

    #[error("{kind} index {index} is out of range for a vocabulary of {size}")]
    IndexOutOfRange { kind: EncoderKind, index: usize, size: usize },
}

pub type EncoderResult<T> = Result<T, EncoderError>;

/// What an encoder's vocabulary holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    User,
    Item,
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncoderKind::User => f.write_str("user"),
            EncoderKind::Item => f.write_str("item"),
        }
    }
}

/// Marker for the vocabulary an encoder covers
pub trait Vocabulary {
    const KIND: EncoderKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Users {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Items {}

impl Vocabulary for Users {
    const KIND: EncoderKind = EncoderKind::User;
}

impl Vocabulary for Items {
    const KIND: EncoderKind = EncoderKind::Item;
}

pub type UserEncoder = IdentifierEncoder<Users>;
pub type ItemEncoder = IdentifierEncoder<Items>;

/// Fitted identifier <-> index mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct IdentifierEncoder<K: Vocabulary> {
    kind: EncoderKind,
    classes: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    _vocabulary: PhantomData<K>,
}

impl<K: Vocabulary> IdentifierEncoder<K> {
    /// Fit on a sequence of raw identifiers; duplicates collapse
    pub fn fit<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = identifiers.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::from_classes(classes.into_iter().collect())
    }

    fn from_classes(classes: Vec<String>) -> Self {
        let index = classes.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
        Self {
            kind: K::KIND,
            classes,
            index,
            _vocabulary: PhantomData,
        }
    }

    /// Rebuild the lookup table after deserialization, checking the stored kind.
    ///
    /// Returns `None` when the classes are unsorted, duplicated or of another kind.
    pub(crate) fn restored(self) -> Option<Self> {
        if self.kind != K::KIND || !self.classes.windows(2).all(|w| w[0] < w[1]) {
            return None;
        }
        Some(Self::from_classes(self.classes))
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    pub fn encode(&self, identifier: &str) -> EncoderResult<usize> {
        self.index
            .get(identifier)
            .copied()
            .ok_or_else(|| EncoderError::UnknownIdentifier {
                kind: self.kind,
                identifier: identifier.to_string(),
            })
    }

    pub fn decode(&self, index: usize) -> EncoderResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(EncoderError::IndexOutOfRange {
                kind: self.kind,
                index,
                size: self.classes.len(),
            })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Number of distinct identifiers seen at fit time
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Identifiers in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// SHA-256 over the kind and the ordered vocabulary, hex encoded
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.to_string().as_bytes());
        for class in &self.classes {
            hasher.update((class.len() as u64).to_le_bytes());
            hasher.update(class.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
