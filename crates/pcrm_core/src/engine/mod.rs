//! Engagement scoring and relationship graph engine.
//!
//! # Responsibility
//! - Resolve occasion dates, score contacts, enrich scores through the social
//!   graph and merge everything into the dashboard feed.
//!
//! # Invariants
//! - Every computation takes `as_of` explicitly; nothing here reads a clock.
//! - Rendering is stateless across calls: it always recomputes from the store.
//!
//! Data flows leaf-first: `recurrence` -> `scorer` -> `graph` -> `dashboard`.

pub mod dashboard;
pub mod graph;
pub mod recurrence;
pub mod scorer;
