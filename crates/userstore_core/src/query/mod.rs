//! Dialect-neutral statement assembly.
//!
//! # Responsibility
//! - Fold ordered column/argument lists into parameterized SQL statements.
//! - Compose `WHERE` clauses from sparse equality predicates.
//!
//! # Invariants
//! - Values are never rendered into SQL text; every value is a placeholder.
//! - Identifiers are always double-quoted.
//! - `UPDATE` and `DELETE` statements always carry a predicate.
//!
//! # See also
//! - crate::repo::user_repo

mod builder;
mod statement;

pub use builder::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
pub use statement::{BuildError, ColumnValues, Placeholder, SqlArg, Statement};
