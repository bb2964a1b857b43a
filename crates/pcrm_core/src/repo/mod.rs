//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store contracts the engine and services depend on.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `UnknownContact`) in
//!   addition to DB transport errors.

pub mod contact_repo;
