//! Domain model for contacts and everything hanging off them.
//!
//! # Responsibility
//! - Define canonical data structures consumed by the engagement engine.
//! - Keep validation rules next to the types they protect.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Interactions, occasions, gifts and edges always reference a live contact id.
//! - Relationship edges are unordered pairs stored in canonical `(low, high)`
//!   order.

pub mod contact;
pub mod date;
pub mod gift;
pub mod interaction;
pub mod occasion;
pub mod relationship;
pub mod suggestion;
