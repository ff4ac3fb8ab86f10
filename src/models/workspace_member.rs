use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role given to the creator of a workspace.
pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub user_id: String,
    pub workspace_id: String,
    pub role: String,
}

impl WorkspaceMember {
    pub fn new(user_id: impl Into<String>, workspace_id: impl Into<String>, role: &str) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            role: role.to_uppercase(),
        }
    }

    pub fn admin(user_id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self::new(user_id, workspace_id, ADMIN_ROLE)
    }
}
