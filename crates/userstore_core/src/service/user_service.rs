//! User use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::user::{CreateUser, DeleteUser, FindUser, UpdateUser, User, UserId};
use crate::repo::user_repo::{RepoResult, UserRepository};

/// Use-case service wrapper for user CRUD operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a user and returns the stored record.
    pub fn create_user(&self, create: &CreateUser) -> RepoResult<User> {
        self.repo.create_user(create)
    }

    pub fn list_users(&self, find: &FindUser) -> RepoResult<Vec<User>> {
        self.repo.list_users(find)
    }

    /// Gets the single user matching `find`.
    ///
    /// Returns `NotFound` for zero matches and `AmbiguousMatch` for several.
    pub fn get_user(&self, find: &FindUser) -> RepoResult<User> {
        self.repo.get_user(find)
    }

    pub fn get_user_by_id(&self, id: UserId) -> RepoResult<User> {
        self.repo.get_user(&FindUser::by_id(id))
    }

    pub fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
        self.repo.get_user(&FindUser::by_username(username))
    }

    /// Applies a sparse patch.
    ///
    /// Returns `NoFieldsToUpdate` or `NotFound` from the repository unchanged.
    pub fn update_user(&self, update: &UpdateUser) -> RepoResult<User> {
        self.repo.update_user(update)
    }

    /// Physically deletes a user by id.
    pub fn delete_user(&self, id: UserId) -> RepoResult<()> {
        self.repo.delete_user(&DeleteUser { id })
    }

    /// Counts every stored user regardless of `row_status`.
    pub fn count_users(&self) -> RepoResult<usize> {
        Ok(self.repo.list_users(&FindUser::default())?.len())
    }
}
