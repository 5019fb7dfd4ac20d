//! User domain model.
//!
//! # Responsibility
//! - Define the persisted `User` record and its enumerated columns.
//! - Define the sparse request shapes consumed by the repository.
//!
//! # Invariants
//! - `row_status` is always `NORMAL` or `ARCHIVED`.
//! - `id` is immutable once assigned; `UpdateUser` only uses it as a key.
//! - This layer never hashes or verifies passwords.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned user identifier.
pub type UserId = i64;

/// Visibility/lifecycle flag stored in `row_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    #[default]
    Normal,
    Archived,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NORMAL" => Some(Self::Normal),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Account role. `User` is the baseline role assigned by the store default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "host" => Some(Self::Host),
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Persisted user record, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unix epoch seconds.
    pub created_ts: i64,
    /// Unix epoch seconds. Refreshed by the store on every update.
    pub updated_ts: i64,
    pub row_status: RowStatus,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub nickname: String,
    /// Pre-hashed credential; never serialized outward.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub avatar_url: String,
}

/// Insert request.
///
/// Required columns are always written. Optional columns are written only
/// when set; otherwise the store default applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub username: String,
    pub role: Role,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub row_status: Option<RowStatus>,
    pub created_ts: Option<i64>,
    pub updated_ts: Option<i64>,
    /// Explicit identity for import paths. Store-generated when `None`.
    pub id: Option<UserId>,
}

impl CreateUser {
    /// Creates an insert request with baseline role and empty profile fields.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: Role::default(),
            email: String::new(),
            nickname: String::new(),
            password_hash: password_hash.into(),
            avatar_url: String::new(),
            row_status: None,
            created_ts: None,
            updated_ts: None,
            id: None,
        }
    }

    /// Validates caller-provided values before any SQL is issued.
    ///
    /// # Errors
    /// - `EmptyUsername` when `username` is blank.
    /// - `EmptyPasswordHash` when `password_hash` is empty.
    /// - `NonPositiveId` / `NonPositiveTimestamp` for out-of-range explicit values.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.username.trim().is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if self.password_hash.is_empty() {
            return Err(UserValidationError::EmptyPasswordHash);
        }
        if let Some(id) = self.id {
            if id <= 0 {
                return Err(UserValidationError::NonPositiveId(id));
            }
        }
        for (column, value) in [
            ("created_ts", self.created_ts),
            ("updated_ts", self.updated_ts),
        ] {
            if let Some(value) = value {
                if value <= 0 {
                    return Err(UserValidationError::NonPositiveTimestamp { column, value });
                }
            }
        }
        Ok(())
    }
}

/// Sparse filter; every populated field is ANDed as an equality predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindUser {
    pub id: Option<UserId>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub nickname: Option<String>,
}

impl FindUser {
    pub fn by_id(id: UserId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.username.is_none()
            && self.role.is_none()
            && self.email.is_none()
            && self.nickname.is_none()
    }
}

impl Display for FindUser {
    /// Renders only keys, never email or nickname values.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "<all>");
        }
        let mut parts = Vec::new();
        if let Some(id) = self.id {
            parts.push(format!("id={id}"));
        }
        if let Some(username) = &self.username {
            parts.push(format!("username={username}"));
        }
        if let Some(role) = self.role {
            parts.push(format!("role={}", role.as_str()));
        }
        if self.email.is_some() {
            parts.push("email=*".to_string());
        }
        if self.nickname.is_some() {
            parts.push("nickname=*".to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Sparse patch keyed by `id`; only populated fields are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUser {
    pub id: UserId,
    pub updated_ts: Option<i64>,
    pub row_status: Option<RowStatus>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateUser {
    /// Creates an empty patch for `id`.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            updated_ts: None,
            row_status: None,
            username: None,
            role: None,
            email: None,
            nickname: None,
            password_hash: None,
            avatar_url: None,
        }
    }

    /// Returns whether at least one column would be written.
    pub fn has_changes(&self) -> bool {
        self.updated_ts.is_some()
            || self.row_status.is_some()
            || self.username.is_some()
            || self.role.is_some()
            || self.email.is_some()
            || self.nickname.is_some()
            || self.password_hash.is_some()
            || self.avatar_url.is_some()
    }

    /// Applies the same value rules as `CreateUser::validate` to the
    /// populated fields.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if matches!(&self.username, Some(username) if username.trim().is_empty()) {
            return Err(UserValidationError::EmptyUsername);
        }
        if matches!(&self.password_hash, Some(hash) if hash.is_empty()) {
            return Err(UserValidationError::EmptyPasswordHash);
        }
        if let Some(value) = self.updated_ts {
            if value <= 0 {
                return Err(UserValidationError::NonPositiveTimestamp {
                    column: "updated_ts",
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Physical delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteUser {
    pub id: UserId,
}

/// Input validation failures raised before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyUsername,
    EmptyPasswordHash,
    NonPositiveId(UserId),
    NonPositiveTimestamp { column: &'static str, value: i64 },
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPasswordHash => write!(f, "password_hash must not be empty"),
            Self::NonPositiveId(id) => write!(f, "explicit user id must be positive, got {id}"),
            Self::NonPositiveTimestamp { column, value } => {
                write!(f, "{column} must be a positive unix time, got {value}")
            }
        }
    }
}

impl Error for UserValidationError {}
