//! SQLite storage bootstrap, bind glue and maintenance primitive.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the user store.
//! - Apply schema migrations in deterministic order.
//! - Bind dialect-neutral `SqlArg` values to rusqlite statements.
//! - Provide the post-delete compaction pass.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories must not touch data before migrations succeed.

use crate::query::SqlArg;
use log::info;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Returns whether the store rejected the statement on an integrity rule
    /// (`UNIQUE`, `CHECK`, `NOT NULL`, primary key).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            Self::Sqlite(_) | Self::UnsupportedSchemaVersion { .. } => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl ToSql for SqlArg {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Integer(value) => Ok(ToSqlOutput::from(*value)),
            Self::Text(value) => Ok(ToSqlOutput::from(value.as_str())),
        }
    }
}

/// Store-level space reclamation invoked after physical deletes.
pub trait Maintenance {
    fn compact(&self, conn: &Connection) -> DbResult<()>;
}

/// Runs SQLite `VACUUM`.
///
/// `VACUUM` cannot run inside an open transaction; callers holding one get
/// the store error back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vacuum;

impl Maintenance for Vacuum {
    fn compact(&self, conn: &Connection) -> DbResult<()> {
        let started_at = Instant::now();
        conn.execute_batch("VACUUM;")?;
        info!(
            "event=db_vacuum module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
