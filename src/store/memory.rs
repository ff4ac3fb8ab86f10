use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::{User, UserChanges, Workspace, WorkspaceChanges, WorkspaceMember};
use crate::store::IdentityStore;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    workspaces: HashMap<String, Workspace>,
    // Insertion order doubles as join order.
    members: Vec<WorkspaceMember>,
}

impl Tables {
    fn has_member(&self, user_id: &str, workspace_id: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.user_id == user_id && m.workspace_id == workspace_id)
    }

    /// Mirrors the foreign keys on `workspaces.owner_id` and `workspace_members`.
    /// PostgreSQL surfaces these as database errors, so they map to a 500 here too.
    fn check_user(&self, user_id: &str, table: &str) -> AppResult<()> {
        if self.users.contains_key(user_id) {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "{} references missing user {}",
                table, user_id
            )))
        }
    }

    fn check_workspace(&self, workspace_id: &str) -> AppResult<()> {
        if self.workspaces.contains_key(workspace_id) {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "workspace_members references missing workspace {}",
                workspace_id
            )))
        }
    }

    fn slug_taken(&self, slug: &str, except_id: Option<&str>) -> bool {
        self.workspaces
            .values()
            .any(|w| w.slug == slug && Some(w.id.as_str()) != except_id)
    }

    fn remove_user(&mut self, id: &str) -> bool {
        if self.users.remove(id).is_none() {
            return false;
        }
        // Mirrors ON DELETE CASCADE on owner_id and workspace_members.user_id.
        let owned: Vec<String> = self
            .workspaces
            .values()
            .filter(|w| w.owner_id == id)
            .map(|w| w.id.clone())
            .collect();
        for workspace_id in owned {
            self.remove_workspace(&workspace_id);
        }
        self.members.retain(|m| m.user_id != id);
        true
    }

    fn remove_workspace(&mut self, id: &str) -> bool {
        if self.workspaces.remove(id).is_none() {
            return false;
        }
        self.members.retain(|m| m.workspace_id != id);
        true
    }
}

/// In-process store with the same observable semantics as the PostgreSQL one,
/// including unique keys, foreign keys and cascading deletes.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self, id: &str) -> Option<User> {
        self.tables.read().await.users.get(id).cloned()
    }

    pub async fn workspace(&self, id: &str) -> Option<Workspace> {
        self.tables.read().await.workspaces.get(id).cloned()
    }

    pub async fn members_of(&self, workspace_id: &str) -> Vec<WorkspaceMember> {
        self.tables
            .read()
            .await
            .members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!("User {} already exists", user.id)));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, id: &str, changes: &UserChanges) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;
        user.email = changes.email.clone();
        user.name = changes.name.clone();
        user.image = changes.image.clone();
        Ok(())
    }

    async fn delete_users(&self, id: &str) -> AppResult<u64> {
        let removed = self.tables.write().await.remove_user(id);
        Ok(u64::from(removed))
    }

    async fn delete_user(&self, id: &str) -> AppResult<()> {
        if self.tables.write().await.remove_user(id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {}", id)))
        }
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| !u.email.is_empty() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_workspace_with_owner(
        &self,
        workspace: &Workspace,
        owner: &WorkspaceMember,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        // Validate both rows before writing either one.
        if tables.workspaces.contains_key(&workspace.id) {
            return Err(AppError::Conflict(format!(
                "Workspace {} already exists",
                workspace.id
            )));
        }
        if tables.slug_taken(&workspace.slug, None) {
            return Err(AppError::Conflict(format!(
                "Workspace slug {} already exists",
                workspace.slug
            )));
        }
        if tables.has_member(&owner.user_id, &owner.workspace_id) {
            return Err(AppError::Conflict(format!(
                "Membership {}/{} already exists",
                owner.workspace_id, owner.user_id
            )));
        }
        tables.check_user(&workspace.owner_id, "workspaces")?;
        tables.check_user(&owner.user_id, "workspace_members")?;
        if owner.workspace_id != workspace.id {
            tables.check_workspace(&owner.workspace_id)?;
        }
        tables
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        tables.members.push(owner.clone());
        Ok(())
    }

    async fn update_workspace(&self, id: &str, changes: &WorkspaceChanges) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.workspaces.contains_key(id) {
            return Err(AppError::NotFound(format!("Workspace {}", id)));
        }
        if tables.slug_taken(&changes.slug, Some(id)) {
            return Err(AppError::Conflict(format!(
                "Workspace slug {} already exists",
                changes.slug
            )));
        }
        if let Some(workspace) = tables.workspaces.get_mut(id) {
            workspace.name = changes.name.clone();
            workspace.slug = changes.slug.clone();
            workspace.image_url = changes.image_url.clone();
        }
        Ok(())
    }

    async fn delete_workspace(&self, id: &str) -> AppResult<()> {
        if self.tables.write().await.remove_workspace(id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Workspace {}", id)))
        }
    }

    async fn insert_member(&self, member: &WorkspaceMember) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.has_member(&member.user_id, &member.workspace_id) {
            return Err(AppError::Conflict(format!(
                "Membership {}/{} already exists",
                member.workspace_id, member.user_id
            )));
        }
        tables.check_user(&member.user_id, "workspace_members")?;
        tables.check_workspace(&member.workspace_id)?;
        tables.members.push(member.clone());
        Ok(())
    }

    async fn first_workspace_for_user(&self, user_id: &str) -> AppResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(|m| m.workspace_id.clone()))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
