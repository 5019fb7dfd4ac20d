//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the user CRUD contract consumed by services.
//! - Isolate SQLite execution and row mapping from callers.
//!
//! # Invariants
//! - Every write is followed by an authoritative read-back or a row-count
//!   check; callers never receive a synthesized record.
//! - Store failures are returned with the operation that produced them.

pub mod user_repo;
