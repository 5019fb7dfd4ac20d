//! Attribute-driven persistence core for user records.
//! This crate owns the user table contract: sparse queries, sparse patches,
//! read-after-write and post-delete compaction.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Maintenance, Vacuum};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{
    CreateUser, DeleteUser, FindUser, Role, RowStatus, UpdateUser, User, UserId,
    UserValidationError,
};
pub use repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserOp, UserRepository};
pub use service::user_service::UserService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
