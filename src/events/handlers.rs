use serde::Serialize;

use crate::config::UserDeleteMode;
use crate::error::AppResult;
use crate::events::payload::{DeletedObject, InvitationAccepted, OrganizationData, UserData};
use crate::models::WorkspaceMember;
use crate::store::IdentityStore;

/// Knobs that change handler behavior, taken from `Config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub user_delete_mode: UserDeleteMode,
}

/// Returned to the event runtime after a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_workspace_id: Option<String>,
}

impl SyncOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }
}

pub async fn sync_user_creation(store: &dyn IdentityStore, data: &UserData) -> AppResult<SyncOutcome> {
    store.insert_user(&data.to_user()).await?;
    tracing::info!("Created user {}", data.id);

    Ok(SyncOutcome {
        user_id: Some(data.id.clone()),
        ..SyncOutcome::ok()
    })
}

pub async fn sync_user_update(store: &dyn IdentityStore, data: &UserData) -> AppResult<SyncOutcome> {
    store.update_user(&data.id, &data.to_changes()).await?;
    tracing::info!("Updated user {}", data.id);

    Ok(SyncOutcome {
        user_id: Some(data.id.clone()),
        ..SyncOutcome::ok()
    })
}

pub async fn sync_user_deletion(
    store: &dyn IdentityStore,
    options: SyncOptions,
    data: &DeletedObject,
) -> AppResult<SyncOutcome> {
    match options.user_delete_mode {
        UserDeleteMode::Lenient => {
            let deleted = store.delete_users(&data.id).await?;
            if deleted == 0 {
                tracing::debug!("User {} was already absent", data.id);
            }
        }
        UserDeleteMode::Strict => store.delete_user(&data.id).await?,
    }
    tracing::info!("Deleted user {}", data.id);

    Ok(SyncOutcome {
        deleted_user_id: Some(data.id.clone()),
        ..SyncOutcome::ok()
    })
}

/// Creates the workspace and makes its creator an `ADMIN` member in one transaction.
pub async fn sync_workspace_creation(
    store: &dyn IdentityStore,
    data: &OrganizationData,
) -> AppResult<SyncOutcome> {
    let workspace = data.to_workspace()?;
    let owner = WorkspaceMember::admin(&workspace.owner_id, &workspace.id);
    store.create_workspace_with_owner(&workspace, &owner).await?;
    tracing::info!("Created workspace {} owned by {}", workspace.id, workspace.owner_id);

    Ok(SyncOutcome {
        workspace_id: Some(workspace.id),
        ..SyncOutcome::ok()
    })
}

pub async fn sync_workspace_update(
    store: &dyn IdentityStore,
    data: &OrganizationData,
) -> AppResult<SyncOutcome> {
    store.update_workspace(&data.id, &data.to_changes()).await?;
    tracing::info!("Updated workspace {}", data.id);

    Ok(SyncOutcome {
        workspace_id: Some(data.id.clone()),
        ..SyncOutcome::ok()
    })
}

pub async fn sync_workspace_deletion(
    store: &dyn IdentityStore,
    data: &DeletedObject,
) -> AppResult<SyncOutcome> {
    store.delete_workspace(&data.id).await?;
    tracing::info!("Deleted workspace {}", data.id);

    Ok(SyncOutcome {
        deleted_workspace_id: Some(data.id.clone()),
        ..SyncOutcome::ok()
    })
}

pub async fn sync_workspace_member_creation(
    store: &dyn IdentityStore,
    data: &InvitationAccepted,
) -> AppResult<SyncOutcome> {
    let member = data.to_member();
    store.insert_member(&member).await?;
    tracing::info!(
        "Added user {} to workspace {} as {}",
        member.user_id,
        member.workspace_id,
        member.role
    );

    Ok(SyncOutcome {
        workspace_id: Some(member.workspace_id),
        user_id: Some(member.user_id),
        ..SyncOutcome::ok()
    })
}
