use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::models::{User, UserChanges, Workspace, WorkspaceChanges, WorkspaceMember};
use crate::store::IdentityStore;

/// PostgreSQL-backed store. Owns a clone of the shared pool.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations become `Conflict`. Everything else, including foreign-key
/// violations for rows that have not been synced yet, stays a database error
/// so the event runtime retries.
fn map_write_error(e: sqlx::Error, what: &str) -> AppError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        AppError::Conflict(format!("{} already exists", what))
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        sqlx::query("INSERT INTO users (id, email, name, image) VALUES ($1, $2, $3, $4)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.image)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &format!("User {}", user.id)))?;
        Ok(())
    }

    #[instrument(skip(self, changes))]
    async fn update_user(&self, id: &str, changes: &UserChanges) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $1, name = $2, image = $3, updated_at = NOW() WHERE id = $4",
        )
        .bind(&changes.email)
        .bind(&changes.name)
        .bind(&changes.image)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_users(&self, id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> AppResult<()> {
        let deleted: Option<(String,)> = sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        deleted
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, image FROM users WHERE email <> '' AND lower(email) = lower($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, workspace, owner), fields(workspace_id = %workspace.id))]
    async fn create_workspace_with_owner(
        &self,
        workspace: &Workspace,
        owner: &WorkspaceMember,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, slug, owner_id, image_url) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.slug)
        .bind(&workspace.owner_id)
        .bind(workspace.image_url.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &format!("Workspace {}", workspace.id)))?;

        sqlx::query("INSERT INTO workspace_members (user_id, workspace_id, role) VALUES ($1, $2, $3)")
            .bind(&owner.user_id)
            .bind(&owner.workspace_id)
            .bind(&owner.role)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_write_error(
                    e,
                    &format!("Membership {}/{}", owner.workspace_id, owner.user_id),
                )
            })?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, changes))]
    async fn update_workspace(&self, id: &str, changes: &WorkspaceChanges) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE workspaces SET name = $1, slug = $2, image_url = $3, updated_at = NOW() WHERE id = $4",
        )
        .bind(&changes.name)
        .bind(&changes.slug)
        .bind(changes.image_url.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("Workspace slug {}", changes.slug)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Workspace {}", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_workspace(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Workspace {}", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, member), fields(user_id = %member.user_id, workspace_id = %member.workspace_id))]
    async fn insert_member(&self, member: &WorkspaceMember) -> AppResult<()> {
        sqlx::query("INSERT INTO workspace_members (user_id, workspace_id, role) VALUES ($1, $2, $3)")
            .bind(&member.user_id)
            .bind(&member.workspace_id)
            .bind(&member.role)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(
                    e,
                    &format!("Membership {}/{}", member.workspace_id, member.user_id),
                )
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn first_workspace_for_user(&self, user_id: &str) -> AppResult<Option<String>> {
        let workspace_id = sqlx::query_scalar::<_, String>(
            "SELECT workspace_id FROM workspace_members WHERE user_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workspace_id)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
