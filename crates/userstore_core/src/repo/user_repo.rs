//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/list/get/update/delete over the `user` table.
//! - Build every statement through `crate::query` so values stay bound.
//!
//! # Invariants
//! - Create and update return the row re-read by `id`, never the input.
//! - Update never issues a statement without a `SET` list and an `id` key.
//! - Delete runs the maintenance pass only after a row was removed.
//!
//! # Composite steps
//! Insert + read-back and delete + maintenance are two independently
//! committed statements. A failure between them leaves the first step
//! applied: an inserted row whose read-back failed still exists, and a
//! deleted row stays deleted when `MaintenanceFailed` is returned. Callers
//! must treat these as at-least-once, not exactly-once.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{DbError, Maintenance, Vacuum};
use crate::model::user::{
    CreateUser, DeleteUser, FindUser, Role, RowStatus, UpdateUser, User, UserId,
    UserValidationError,
};
use crate::query::{
    BuildError, ColumnValues, DeleteBuilder, InsertBuilder, Placeholder, SelectBuilder,
    Statement, UpdateBuilder,
};
use log::{debug, info, warn};
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const USER_TABLE: &str = "user";
const PLACEHOLDER: Placeholder = Placeholder::Question;
/// Store clock in unix seconds, same expression as the column defaults.
const NOW_UNIX_SECONDS: &str = "CAST(strftime('%s', 'now') AS INTEGER)";

/// Read column list. `parse_user_row` scans positionally in this order.
const USER_COLUMNS: &[&str] = &[
    "id",
    "username",
    "role",
    "email",
    "nickname",
    "password_hash",
    "avatar_url",
    "row_status",
    "created_ts",
    "updated_ts",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository operation, carried by errors for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOp {
    /// Readiness checks run when a repository is constructed.
    Open,
    Create,
    List,
    Get,
    Update,
    Delete,
}

impl UserOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open_user_repository",
            Self::Create => "create_user",
            Self::List => "list_users",
            Self::Get => "get_user",
            Self::Update => "update_user",
            Self::Delete => "delete_user",
        }
    }
}

impl Display for UserOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from user repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller input rejected before any SQL was issued.
    Validation(UserValidationError),
    /// Store rejected the write on an integrity rule (e.g. duplicate username).
    ConstraintViolation { op: UserOp, source: DbError },
    /// No row matched an identity-based operation.
    NotFound { op: UserOp, key: String },
    /// Update requested without any field to set.
    NoFieldsToUpdate(UserId),
    /// Read-back returned a row count that cannot happen. Not retryable.
    UnexpectedRowCount { op: UserOp, count: usize },
    /// Get matched more than one row.
    AmbiguousMatch { key: String, count: usize },
    /// Read statement column count differs from the row mapper arity.
    UnexpectedColumnCount { expected: usize, actual: usize },
    /// Statement assembly failed.
    Statement { op: UserOp, source: BuildError },
    /// Any other store or connectivity failure.
    Storage { op: UserOp, source: DbError },
    /// Row was deleted but the compaction pass failed afterwards.
    MaintenanceFailed { id: UserId, source: DbError },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into a valid `User`.
    InvalidData(String),
}

impl RepoError {
    /// Wraps a store failure, classifying integrity violations.
    fn from_store(op: UserOp, err: impl Into<DbError>) -> Self {
        let source = err.into();
        if source.is_constraint_violation() {
            Self::ConstraintViolation { op, source }
        } else {
            Self::Storage { op, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ConstraintViolation { .. } => "constraint_violation",
            Self::NotFound { .. } => "not_found",
            Self::NoFieldsToUpdate(_) => "no_fields_to_update",
            Self::UnexpectedRowCount { .. } => "unexpected_row_count",
            Self::AmbiguousMatch { .. } => "ambiguous_match",
            Self::UnexpectedColumnCount { .. } => "unexpected_column_count",
            Self::Statement { .. } => "statement",
            Self::Storage { .. } => "storage",
            Self::MaintenanceFailed { .. } => "maintenance_failed",
            Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => "connection_not_ready",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ConstraintViolation { op, source } => {
                write!(f, "{op}: constraint violation: {source}")
            }
            Self::NotFound { op, key } => write!(f, "{op}: user not found ({key})"),
            Self::NoFieldsToUpdate(id) => write!(f, "update_user: no fields to update for id={id}"),
            Self::UnexpectedRowCount { op, count } => {
                write!(f, "{op}: unexpected user count: {count}")
            }
            Self::AmbiguousMatch { key, count } => {
                write!(f, "get_user: {count} users match ({key}), expected exactly one")
            }
            Self::UnexpectedColumnCount { expected, actual } => write!(
                f,
                "user row mapper expects {expected} columns, statement yields {actual}"
            ),
            Self::Statement { op, source } => write!(f, "{op}: {source}"),
            Self::Storage { op, source } => write!(f, "{op}: {source}"),
            Self::MaintenanceFailed { id, source } => write!(
                f,
                "delete_user: user id={id} removed but maintenance failed: {source}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version is {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Statement { source, .. } => Some(source),
            Self::ConstraintViolation { source, .. }
            | Self::Storage { source, .. }
            | Self::MaintenanceFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    /// Inserts a user and returns the stored row, including store defaults.
    fn create_user(&self, create: &CreateUser) -> RepoResult<User>;
    /// Lists matching users ordered by `created_ts DESC, row_status DESC`.
    fn list_users(&self, find: &FindUser) -> RepoResult<Vec<User>>;
    /// Returns the single matching user.
    fn get_user(&self, find: &FindUser) -> RepoResult<User>;
    /// Applies a sparse patch and returns the stored row.
    fn update_user(&self, update: &UpdateUser) -> RepoResult<User>;
    /// Physically removes a user, then runs the maintenance pass.
    fn delete_user(&self, delete: &DeleteUser) -> RepoResult<()>;
}

/// SQLite-backed user repository over a caller-owned connection.
pub struct SqliteUserRepository<'conn, M = Vacuum> {
    conn: &'conn Connection,
    maintenance: M,
}

impl<'conn> SqliteUserRepository<'conn, Vacuum> {
    /// Constructs a repository from a migrated connection, compacting with
    /// `VACUUM` after deletes.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_maintenance(conn, Vacuum)
    }
}

impl<'conn, M: Maintenance> SqliteUserRepository<'conn, M> {
    /// Constructs a repository with a custom post-delete maintenance pass.
    pub fn with_maintenance(conn: &'conn Connection, maintenance: M) -> RepoResult<Self> {
        ensure_user_connection_ready(conn)?;
        Ok(Self { conn, maintenance })
    }

    fn read_back(&self, op: UserOp, id: UserId) -> RepoResult<User> {
        let mut users = query_users(self.conn, &select_statement(&FindUser::by_id(id)), op)?;
        match users.len() {
            1 => Ok(users.remove(0)),
            count => Err(RepoError::UnexpectedRowCount { op, count }),
        }
    }
}

impl<M: Maintenance> UserRepository for SqliteUserRepository<'_, M> {
    fn create_user(&self, create: &CreateUser) -> RepoResult<User> {
        let started_at = Instant::now();
        create.validate()?;

        let stmt = insert_statement(create).map_err(|source| RepoError::Statement {
            op: UserOp::Create,
            source,
        })?;
        let id: UserId = self
            .conn
            .query_row(&stmt.sql, params_from_iter(stmt.args.iter()), |row| {
                row.get(0)
            })
            .map_err(|err| log_failure(RepoError::from_store(UserOp::Create, err)))?;

        let user = self.read_back(UserOp::Create, id).map_err(log_failure)?;
        info!(
            "event=user_create module=repo status=ok user_id={} duration_ms={}",
            user.id,
            started_at.elapsed().as_millis()
        );
        Ok(user)
    }

    fn list_users(&self, find: &FindUser) -> RepoResult<Vec<User>> {
        let started_at = Instant::now();
        let users = query_users(self.conn, &select_statement(find), UserOp::List)
            .map_err(log_failure)?;
        debug!(
            "event=user_list module=repo status=ok filter=\"{find}\" rows={} duration_ms={}",
            users.len(),
            started_at.elapsed().as_millis()
        );
        Ok(users)
    }

    fn get_user(&self, find: &FindUser) -> RepoResult<User> {
        let mut users = query_users(self.conn, &select_statement(find), UserOp::Get)
            .map_err(log_failure)?;
        match users.len() {
            0 => Err(RepoError::NotFound {
                op: UserOp::Get,
                key: find.to_string(),
            }),
            1 => Ok(users.remove(0)),
            count => Err(log_failure(RepoError::AmbiguousMatch {
                key: find.to_string(),
                count,
            })),
        }
    }

    fn update_user(&self, update: &UpdateUser) -> RepoResult<User> {
        let started_at = Instant::now();
        if !update.has_changes() {
            return Err(RepoError::NoFieldsToUpdate(update.id));
        }
        update.validate()?;

        let stmt = update_statement(update).map_err(|source| RepoError::Statement {
            op: UserOp::Update,
            source,
        })?;
        let changed = self
            .conn
            .execute(&stmt.sql, params_from_iter(stmt.args.iter()))
            .map_err(|err| log_failure(RepoError::from_store(UserOp::Update, err)))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                op: UserOp::Update,
                key: format!("id={}", update.id),
            });
        }

        let user = self.read_back(UserOp::Update, update.id).map_err(log_failure)?;
        info!(
            "event=user_update module=repo status=ok user_id={} duration_ms={}",
            user.id,
            started_at.elapsed().as_millis()
        );
        Ok(user)
    }

    fn delete_user(&self, delete: &DeleteUser) -> RepoResult<()> {
        let started_at = Instant::now();
        let stmt = delete_statement(delete.id).map_err(|source| RepoError::Statement {
            op: UserOp::Delete,
            source,
        })?;
        let changed = self
            .conn
            .execute(&stmt.sql, params_from_iter(stmt.args.iter()))
            .map_err(|err| log_failure(RepoError::from_store(UserOp::Delete, err)))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                op: UserOp::Delete,
                key: format!("id={}", delete.id),
            });
        }

        if let Err(source) = self.maintenance.compact(self.conn) {
            return Err(log_failure(RepoError::MaintenanceFailed {
                id: delete.id,
                source,
            }));
        }

        info!(
            "event=user_delete module=repo status=ok user_id={} duration_ms={}",
            delete.id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn log_failure(err: RepoError) -> RepoError {
    warn!(
        "event=user_repo module=repo status=error error_code={} error={}",
        err.code(),
        err
    );
    err
}

fn insert_statement(create: &CreateUser) -> Result<Statement, BuildError> {
    let mut values = ColumnValues::new();
    values.push("username", create.username.as_str());
    values.push("role", create.role.as_str());
    values.push("email", create.email.as_str());
    values.push("nickname", create.nickname.as_str());
    values.push("password_hash", create.password_hash.as_str());
    values.push("avatar_url", create.avatar_url.as_str());
    values.push_some("row_status", create.row_status.map(RowStatus::as_str));
    values.push_some("created_ts", create.created_ts);
    values.push_some("updated_ts", create.updated_ts);
    values.push_some("id", create.id);

    InsertBuilder::into_table(USER_TABLE)
        .values(values)
        .returning("id")
        .build(PLACEHOLDER)
}

fn select_statement(find: &FindUser) -> Statement {
    let mut predicate = ColumnValues::new();
    predicate.push_some("id", find.id);
    predicate.push_some("username", find.username.as_deref());
    predicate.push_some("role", find.role.map(Role::as_str));
    predicate.push_some("email", find.email.as_deref());
    predicate.push_some("nickname", find.nickname.as_deref());

    SelectBuilder::from(USER_TABLE, USER_COLUMNS)
        .filter(predicate)
        .order_by_desc("created_ts")
        .order_by_desc("row_status")
        .build(PLACEHOLDER)
}

fn update_statement(update: &UpdateUser) -> Result<Statement, BuildError> {
    let mut set = ColumnValues::new();
    match update.updated_ts {
        Some(updated_ts) => set.push("updated_ts", updated_ts),
        None => set.push_expr("updated_ts", NOW_UNIX_SECONDS),
    }
    set.push_some("row_status", update.row_status.map(RowStatus::as_str));
    set.push_some("username", update.username.as_deref());
    set.push_some("role", update.role.map(Role::as_str));
    set.push_some("email", update.email.as_deref());
    set.push_some("nickname", update.nickname.as_deref());
    set.push_some("password_hash", update.password_hash.as_deref());
    set.push_some("avatar_url", update.avatar_url.as_deref());

    let mut predicate = ColumnValues::new();
    predicate.push("id", update.id);

    UpdateBuilder::table(USER_TABLE)
        .set(set)
        .filter(predicate)
        .build(PLACEHOLDER)
}

fn delete_statement(id: UserId) -> Result<Statement, BuildError> {
    let mut predicate = ColumnValues::new();
    predicate.push("id", id);
    DeleteBuilder::from(USER_TABLE)
        .filter(predicate)
        .build(PLACEHOLDER)
}

fn query_users(conn: &Connection, stmt: &Statement, op: UserOp) -> RepoResult<Vec<User>> {
    let mut prepared = conn
        .prepare(&stmt.sql)
        .map_err(|err| RepoError::from_store(op, err))?;
    if prepared.column_count() != USER_COLUMNS.len() {
        return Err(RepoError::UnexpectedColumnCount {
            expected: USER_COLUMNS.len(),
            actual: prepared.column_count(),
        });
    }

    let mut rows = prepared
        .query(params_from_iter(stmt.args.iter()))
        .map_err(|err| RepoError::from_store(op, err))?;
    let mut users = Vec::new();
    while let Some(row) = rows.next().map_err(|err| RepoError::from_store(op, err))? {
        users.push(parse_user_row(row, op)?);
    }
    Ok(users)
}

fn parse_user_row(row: &Row<'_>, op: UserOp) -> RepoResult<User> {
    let store = |err: rusqlite::Error| RepoError::from_store(op, err);

    let role_text: String = row.get(2).map_err(store)?;
    let role = Role::parse(&role_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role `{role_text}` in user.role")))?;

    let status_text: String = row.get(7).map_err(store)?;
    let row_status = RowStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid row status `{status_text}` in user.row_status"
        ))
    })?;

    Ok(User {
        id: row.get(0).map_err(store)?,
        username: row.get(1).map_err(store)?,
        role,
        email: row.get(3).map_err(store)?,
        nickname: row.get(4).map_err(store)?,
        password_hash: row.get(5).map_err(store)?,
        avatar_url: row.get(6).map_err(store)?,
        row_status,
        created_ts: row.get(8).map_err(store)?,
        updated_ts: row.get(9).map_err(store)?,
    })
}

fn ensure_user_connection_ready(conn: &Connection) -> RepoResult<()> {
    let store = |err: rusqlite::Error| RepoError::from_store(UserOp::Open, err);

    let expected_version = latest_version();
    let actual_version =
        current_version(conn).map_err(|err| RepoError::from_store(UserOp::Open, err))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    // `pragma_table_info` yields no rows for a table that does not exist.
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1);")
        .map_err(store)?;
    let present = stmt
        .query_map([USER_TABLE], |row| row.get::<_, String>(0))
        .map_err(store)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(store)?;
    if present.is_empty() {
        return Err(RepoError::MissingRequiredTable(USER_TABLE));
    }

    match USER_COLUMNS
        .iter()
        .find(|column| !present.contains(**column))
    {
        Some(&column) => Err(RepoError::MissingRequiredColumn {
            table: USER_TABLE,
            column,
        }),
        None => Ok(()),
    }
}
