//! Domain model for the user store.
//!
//! # Responsibility
//! - Define the canonical `User` record and its sparse filter/patch shapes.
//!
//! # Invariants
//! - `UserId` values are assigned by the store and never reused.
//! - Sparse shapes use `Option` for every field that may be left untouched.
//!
//! # See also
//! - crate::repo::user_repo

pub mod user;
