//! In-memory relationship graph.
//!
//! # Responsibility
//! - Keep contacts as nodes and relationships as typed, weighted edges.
//! - Answer neighborhood, component and centrality queries for visualization.
//! - Provide the social-proximity boost used to enrich engagement scores.
//!
//! # Invariants
//! - Simple undirected graph: no self loops, at most one edge per unordered
//!   pair. Re-adding a pair updates its kind and strength.
//! - Every edge endpoint is a known node; removing a node removes its edges.
//! - Queries on unknown ids fail with `UnknownContactError` instead of
//!   returning empty results.
//!
//! Storage is index-based: node labels, an adjacency map and a separate edge
//! attribute map keyed by the canonical `(low, high)` pair. `BTreeMap`s keep
//! iteration and export order deterministic.

use crate::model::contact::ContactId;
use crate::model::relationship::{canonical_pair, RelationshipEdge, RelationshipKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Graph operation referenced a contact id the graph does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownContactError(pub ContactId);

impl Display for UnknownContactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown contact: {}", self.0)
    }
}

impl Error for UnknownContactError {}

/// Errors from graph mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    UnknownContact(UnknownContactError),
    SelfLoop(ContactId),
    InvalidStrength(f64),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContact(err) => write!(f, "{err}"),
            Self::SelfLoop(id) => write!(f, "contact {id} cannot be related to itself"),
            Self::InvalidStrength(value) => {
                write!(f, "relationship strength must be within [0, 1], got {value}")
            }
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownContact(err) => Some(err),
            Self::SelfLoop(_) | Self::InvalidStrength(_) => None,
        }
    }
}

impl From<UnknownContactError> for GraphError {
    fn from(value: UnknownContactError) -> Self {
        Self::UnknownContact(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeAttrs {
    kind: RelationshipKind,
    strength: f64,
}

/// Node entry in a graph export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: ContactId,
    pub label: String,
}

/// Edge entry in a graph export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub a: ContactId,
    pub b: ContactId,
    pub kind: RelationshipKind,
    pub weight: f64,
}

/// Layout-ready snapshot for an external graph-drawing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphExport {
    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Undirected weighted contact graph.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    labels: BTreeMap<ContactId, String>,
    adjacency: BTreeMap<ContactId, BTreeSet<ContactId>>,
    edges: BTreeMap<(ContactId, ContactId), EdgeAttrs>,
    max_proximity_boost: f64,
}

impl RelationshipGraph {
    /// Creates an empty graph whose proximity boost is capped at `max_proximity_boost`.
    pub fn new(max_proximity_boost: f64) -> Self {
        Self {
            max_proximity_boost,
            ..Self::default()
        }
    }

    /// Adds a node, or refreshes its label when it already exists.
    pub fn add_contact(&mut self, id: ContactId, label: impl Into<String>) {
        self.labels.insert(id, label.into());
        self.adjacency.entry(id).or_default();
    }

    pub fn contains(&self, id: ContactId) -> bool {
        self.labels.contains_key(&id)
    }

    pub fn contact_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Inserts an edge or updates the existing edge for the same pair.
    ///
    /// # Errors
    /// - `UnknownContact` when either endpoint is not a node.
    /// - `SelfLoop` when `a == b`.
    /// - `InvalidStrength` when `strength` is outside `[0, 1]`.
    pub fn add_or_update_edge(
        &mut self,
        a: ContactId,
        b: ContactId,
        kind: RelationshipKind,
        strength: f64,
    ) -> Result<(), GraphError> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if !strength.is_finite() || !(0.0..=1.0).contains(&strength) {
            return Err(GraphError::InvalidStrength(strength));
        }

        self.edges
            .insert(canonical_pair(a, b), EdgeAttrs { kind, strength });
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Inserts a stored edge record.
    pub fn add_edge(&mut self, edge: &RelationshipEdge) -> Result<(), GraphError> {
        self.add_or_update_edge(edge.low, edge.high, edge.kind, edge.strength)
    }

    /// Removes the edge between `a` and `b`. Returns whether an edge existed.
    pub fn remove_edge(&mut self, a: ContactId, b: ContactId) -> Result<bool, UnknownContactError> {
        self.require(a)?;
        self.require(b)?;
        let removed = self.edges.remove(&canonical_pair(a, b)).is_some();
        if removed {
            self.unlink(a, b);
        }
        Ok(removed)
    }

    /// Removes a node and every edge incident to it.
    pub fn remove_contact(&mut self, id: ContactId) -> Result<(), UnknownContactError> {
        self.require(id)?;
        let neighbors = self.adjacency.remove(&id).unwrap_or_default();
        for neighbor in neighbors {
            self.edges.remove(&canonical_pair(id, neighbor));
            if let Some(set) = self.adjacency.get_mut(&neighbor) {
                set.remove(&id);
            }
        }
        self.labels.remove(&id);
        Ok(())
    }

    /// Returns the ids directly linked to `id`.
    pub fn neighbors(&self, id: ContactId) -> Result<BTreeSet<ContactId>, UnknownContactError> {
        self.require(id)?;
        Ok(self.adjacency.get(&id).cloned().unwrap_or_default())
    }

    /// Returns the kind and strength of the edge between `a` and `b`, if any.
    pub fn edge(
        &self,
        a: ContactId,
        b: ContactId,
    ) -> Result<Option<(RelationshipKind, f64)>, UnknownContactError> {
        self.require(a)?;
        self.require(b)?;
        Ok(self
            .edges
            .get(&canonical_pair(a, b))
            .map(|attrs| (attrs.kind, attrs.strength)))
    }

    /// Returns every id reachable from `id`, including `id` itself (BFS).
    pub fn connected_component(
        &self,
        id: ContactId,
    ) -> Result<BTreeSet<ContactId>, UnknownContactError> {
        self.require(id)?;
        let mut seen = BTreeSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for neighbor in self.adjacency.get(&current).into_iter().flatten() {
                if seen.insert(*neighbor) {
                    queue.push_back(*neighbor);
                }
            }
        }
        Ok(seen)
    }

    /// Neighbor count divided by `contact_count - 1`; 0 for single-node graphs.
    pub fn degree_centrality(&self, id: ContactId) -> Result<f64, UnknownContactError> {
        let degree = self.neighbors(id)?.len();
        let others = self.contact_count().saturating_sub(1);
        if others == 0 {
            return Ok(0.0);
        }
        Ok(degree as f64 / others as f64)
    }

    /// Mean of `strength * neighbor_score` over all neighbors, capped at the
    /// configured maximum boost.
    ///
    /// Neighbors missing from `scores` contribute 0. Isolated nodes get 0.
    pub fn proximity_boost(
        &self,
        id: ContactId,
        scores: &HashMap<ContactId, f64>,
    ) -> Result<f64, UnknownContactError> {
        let neighbors = self.neighbors(id)?;
        if neighbors.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = neighbors
            .iter()
            .map(|neighbor| {
                let strength = self
                    .edges
                    .get(&canonical_pair(id, *neighbor))
                    .map_or(0.0, |attrs| attrs.strength);
                strength * scores.get(neighbor).copied().unwrap_or(0.0)
            })
            .sum();
        let mean = total / neighbors.len() as f64;
        Ok(mean.min(self.max_proximity_boost).max(0.0))
    }

    /// Returns a snapshot of nodes and edges in id order.
    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self
                .labels
                .iter()
                .map(|(id, label)| GraphNode {
                    id: *id,
                    label: label.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|((a, b), attrs)| GraphEdge {
                    a: *a,
                    b: *b,
                    kind: attrs.kind,
                    weight: attrs.strength,
                })
                .collect(),
        }
    }

    fn require(&self, id: ContactId) -> Result<(), UnknownContactError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(UnknownContactError(id))
        }
    }

    fn unlink(&mut self, a: ContactId, b: ContactId) {
        if let Some(set) = self.adjacency.get_mut(&a) {
            set.remove(&b);
        }
        if let Some(set) = self.adjacency.get_mut(&b) {
            set.remove(&a);
        }
    }
}
