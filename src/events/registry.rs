use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::events::handlers::{self, SyncOptions, SyncOutcome};
use crate::store::IdentityStore;

/// Application id reported to the event runtime.
pub const APP_ID: &str = "TeamSync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    UserCreated,
    UserUpdated,
    UserDeleted,
    WorkspaceCreated,
    WorkspaceUpdated,
    WorkspaceDeleted,
    MemberAdded,
}

/// One row of the event table: which function handles which trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFunction {
    pub id: &'static str,
    pub name: &'static str,
    pub event: &'static str,
    pub kind: SyncKind,
}

pub const FUNCTIONS: &[SyncFunction] = &[
    SyncFunction {
        id: "sync-user-from-clerk",
        name: "Save user data to database",
        event: "clerk/user.created",
        kind: SyncKind::UserCreated,
    },
    SyncFunction {
        id: "sync-user-deletion-from-clerk",
        name: "Delete user from database",
        event: "clerk/user.deleted",
        kind: SyncKind::UserDeleted,
    },
    SyncFunction {
        id: "sync-user-update-from-clerk",
        name: "Update user data in database",
        event: "clerk/user.updated",
        kind: SyncKind::UserUpdated,
    },
    SyncFunction {
        id: "sync-workspace-from-clerk",
        name: "Save workspace data to database",
        event: "clerk/workspace.created",
        kind: SyncKind::WorkspaceCreated,
    },
    SyncFunction {
        id: "sync-workspace-update-from-clerk",
        name: "Update workspace data in database",
        event: "clerk/organization.updated",
        kind: SyncKind::WorkspaceUpdated,
    },
    SyncFunction {
        id: "sync-workspace-deletion-from-clerk",
        name: "Delete workspace from database",
        event: "clerk/organization.deleted",
        kind: SyncKind::WorkspaceDeleted,
    },
    SyncFunction {
        id: "sync-workspace-member-addition-from-clerk",
        name: "Save workspace member data to database",
        event: "clerk/organizationInvitation.accepted",
        kind: SyncKind::MemberAdded,
    },
];

/// An event as delivered by the runtime. Only `name` and `data` are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

impl SyncFunction {
    pub fn for_event(name: &str) -> Option<&'static SyncFunction> {
        FUNCTIONS.iter().find(|f| f.event == name)
    }

    pub fn by_id(id: &str) -> Option<&'static SyncFunction> {
        FUNCTIONS.iter().find(|f| f.id == id)
    }

    /// Parses `data` into this function's payload type and applies it.
    pub async fn run(
        &self,
        store: &dyn IdentityStore,
        options: SyncOptions,
        data: &serde_json::Value,
    ) -> AppResult<SyncOutcome> {
        match self.kind {
            SyncKind::UserCreated => {
                handlers::sync_user_creation(store, &self.parse(data)?).await
            }
            SyncKind::UserUpdated => handlers::sync_user_update(store, &self.parse(data)?).await,
            SyncKind::UserDeleted => {
                handlers::sync_user_deletion(store, options, &self.parse(data)?).await
            }
            SyncKind::WorkspaceCreated => {
                handlers::sync_workspace_creation(store, &self.parse(data)?).await
            }
            SyncKind::WorkspaceUpdated => {
                handlers::sync_workspace_update(store, &self.parse(data)?).await
            }
            SyncKind::WorkspaceDeleted => {
                handlers::sync_workspace_deletion(store, &self.parse(data)?).await
            }
            SyncKind::MemberAdded => {
                handlers::sync_workspace_member_creation(store, &self.parse(data)?).await
            }
        }
    }

    fn parse<T: DeserializeOwned>(&self, data: &serde_json::Value) -> AppResult<T> {
        T::deserialize(data).map_err(|e| {
            AppError::InvalidInput(format!("Invalid payload for {}: {}", self.event, e))
        })
    }
}

/// Routes an event to the function registered for its name.
pub async fn dispatch(
    store: &dyn IdentityStore,
    options: SyncOptions,
    event: &Event,
) -> AppResult<SyncOutcome> {
    let function = SyncFunction::for_event(&event.name)
        .ok_or_else(|| AppError::UnknownEvent(event.name.clone()))?;
    tracing::debug!("Dispatching {} to {}", event.name, function.id);
    function.run(store, options, &event.data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryIdentityStore;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_table_has_unique_ids_and_events() {
        let ids: HashSet<_> = FUNCTIONS.iter().map(|f| f.id).collect();
        let events: HashSet<_> = FUNCTIONS.iter().map(|f| f.event).collect();
        assert_eq!(ids.len(), FUNCTIONS.len());
        assert_eq!(events.len(), FUNCTIONS.len());
        assert_eq!(FUNCTIONS.len(), 7);
    }

    #[test]
    fn test_lookups() {
        let f = SyncFunction::for_event("clerk/organizationInvitation.accepted").unwrap();
        assert_eq!(f.kind, SyncKind::MemberAdded);
        assert_eq!(
            SyncFunction::by_id("sync-user-deletion-from-clerk").map(|f| f.event),
            Some("clerk/user.deleted")
        );
        assert!(SyncFunction::for_event("clerk/session.created").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_event() {
        let store = MemoryIdentityStore::new();
        let event = Event {
            name: "clerk/session.created".to_string(),
            data: json!({}),
            id: None,
            ts: None,
        };
        let err = dispatch(&store, SyncOptions::default(), &event).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownEvent(_)));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_malformed_payload() {
        let store = MemoryIdentityStore::new();
        let event = Event {
            name: "clerk/user.created".to_string(),
            data: json!({"first_name": "Ada"}),
            id: None,
            ts: None,
        };
        let err = dispatch(&store, SyncOptions::default(), &event).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_user_created() {
        let store = MemoryIdentityStore::new();
        let event: Event = serde_json::from_value(json!({
            "name": "clerk/user.created",
            "data": {
                "id": "user_ada",
                "email_addresses": [{"email_address": "ada@example.com"}],
                "first_name": "Ada",
                "last_name": "Lovelace"
            }
        }))
        .unwrap();

        let outcome = dispatch(&store, SyncOptions::default(), &event).await.unwrap();
        assert_eq!(outcome.user_id.as_deref(), Some("user_ada"));
        assert_eq!(store.user("user_ada").await.unwrap().name, "Ada Lovelace");
    }
}
