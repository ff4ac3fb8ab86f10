//! Persistence for the identity replica.
//!
//! Handlers only talk to [`IdentityStore`]; production wires in
//! [`PgIdentityStore`], tests and local runs can use [`MemoryIdentityStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{User, UserChanges, Workspace, WorkspaceChanges, WorkspaceMember};

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> AppResult<()>;

    /// Fails with `NotFound` when no user has this id.
    async fn update_user(&self, id: &str, changes: &UserChanges) -> AppResult<()>;

    /// Deletes every user with this id and returns how many rows went away.
    async fn delete_users(&self, id: &str) -> AppResult<u64>;

    /// Deletes exactly one user; `NotFound` when absent.
    async fn delete_user(&self, id: &str) -> AppResult<()>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Inserts the workspace and its owner membership atomically.
    async fn create_workspace_with_owner(
        &self,
        workspace: &Workspace,
        owner: &WorkspaceMember,
    ) -> AppResult<()>;

    async fn update_workspace(&self, id: &str, changes: &WorkspaceChanges) -> AppResult<()>;

    async fn delete_workspace(&self, id: &str) -> AppResult<()>;

    async fn insert_member(&self, member: &WorkspaceMember) -> AppResult<()>;

    /// Oldest workspace the user belongs to, if any.
    async fn first_workspace_for_user(&self, user_id: &str) -> AppResult<Option<String>>;

    async fn ping(&self) -> AppResult<()>;
}
