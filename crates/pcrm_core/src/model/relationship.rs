//! Typed, weighted links between two contacts.

use crate::model::contact::ContactId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Relationship category shown on graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Family,
    Friend,
    Colleague,
    Other,
}

impl RelationshipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Friend => "friend",
            Self::Colleague => "colleague",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "family" => Some(Self::Family),
            "friend" => Some(Self::Friend),
            "colleague" => Some(Self::Colleague),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Validation failures for relationship writes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeValidationError {
    SelfLoop(ContactId),
    StrengthOutOfRange(f64),
}

impl Display for EdgeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLoop(id) => write!(f, "contact {id} cannot be related to itself"),
            Self::StrengthOutOfRange(value) => {
                write!(f, "relationship strength must be within [0, 1], got {value}")
            }
        }
    }
}

impl Error for EdgeValidationError {}

/// Undirected edge between two contacts.
///
/// # Invariants
/// - `low <= high`; constructors canonicalize the pair.
/// - `strength` is expected within `[0, 1]`; the graph rejects other values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub low: ContactId,
    pub high: ContactId,
    pub kind: RelationshipKind,
    pub strength: f64,
}

impl RelationshipEdge {
    /// Creates an edge, ordering the endpoints canonically.
    pub fn new(a: ContactId, b: ContactId, kind: RelationshipKind, strength: f64) -> Self {
        let (low, high) = canonical_pair(a, b);
        Self {
            low,
            high,
            kind,
            strength,
        }
    }

    /// Rejects self loops and strengths outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), EdgeValidationError> {
        if self.low == self.high {
            return Err(EdgeValidationError::SelfLoop(self.low));
        }
        if !self.strength.is_finite() || !(0.0..=1.0).contains(&self.strength) {
            return Err(EdgeValidationError::StrengthOutOfRange(self.strength));
        }
        Ok(())
    }
}

/// Orders an unordered pair as `(low, high)`.
pub fn canonical_pair(a: ContactId, b: ContactId) -> (ContactId, ContactId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
