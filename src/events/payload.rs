//! Clerk webhook `data` objects and their mapping onto store records.
//!
//! Optional fields degrade to empty strings the same way the identity
//! provider's own dashboards render them; only identifiers are required.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{User, UserChanges, Workspace, WorkspaceChanges, WorkspaceMember};

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub email_address: Option<String>,
}

/// `clerk/user.created` and `clerk/user.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UserData {
    pub fn primary_email(&self) -> String {
        self.email_addresses
            .first()
            .and_then(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        display_name(self.first_name.as_deref(), self.last_name.as_deref())
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.primary_email(),
            name: self.display_name(),
            image: self.image_url.clone().unwrap_or_default(),
        }
    }

    pub fn to_changes(&self) -> UserChanges {
        self.to_user().into()
    }
}

/// `clerk/user.deleted` and `clerk/organization.deleted` only carry the id.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedObject {
    pub id: String,
}

/// `clerk/workspace.created` and `clerk/organization.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationData {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl OrganizationData {
    /// Empty image URLs are stored as NULL.
    pub fn image_url(&self) -> Option<String> {
        self.image_url.clone().filter(|url| !url.is_empty())
    }

    pub fn to_workspace(&self) -> AppResult<Workspace> {
        let owner_id = self
            .created_by
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("organization {} has no created_by", self.id))
            })?;

        Ok(Workspace {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
            owner_id,
            image_url: self.image_url(),
        })
    }

    pub fn to_changes(&self) -> WorkspaceChanges {
        WorkspaceChanges {
            name: self.name.clone(),
            slug: self.slug.clone(),
            image_url: self.image_url(),
        }
    }
}

/// `clerk/organizationInvitation.accepted`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvitationAccepted {
    pub user_id: String,
    pub organization_id: String,
    #[serde(alias = "role")]
    pub role_name: String,
}

impl InvitationAccepted {
    pub fn to_member(&self) -> WorkspaceMember {
        WorkspaceMember::new(&self.user_id, &self.organization_id, &self.role_name)
    }
}

/// Joins first and last name with one space and trims the result.
pub fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_data(value: serde_json::Value) -> UserData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("Ada"), Some("Lovelace")), "Ada Lovelace");
        assert_eq!(display_name(None, Some("Lovelace")), "Lovelace");
        assert_eq!(display_name(Some("Ada"), None), "Ada");
        assert_eq!(display_name(None, None), "");
    }

    #[test]
    fn test_user_uses_first_email_address() {
        let data = user_data(json!({
            "id": "user_1",
            "email_addresses": [
                {"email_address": "ada@example.com"},
                {"email_address": "countess@example.com"}
            ],
            "first_name": "Ada",
            "last_name": "Lovelace",
            "image_url": "https://img.example.com/ada.png"
        }));

        let user = data.to_user();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.image, "https://img.example.com/ada.png");
    }

    #[test]
    fn test_user_with_missing_fields_degrades_to_empty() {
        let data = user_data(json!({
            "id": "user_2",
            "email_addresses": [],
            "first_name": null,
            "last_name": "Lovelace"
        }));

        let user = data.to_user();
        assert_eq!(user.email, "");
        assert_eq!(user.name, "Lovelace");
        assert_eq!(user.image, "");

        let without_list = user_data(json!({"id": "user_3"}));
        assert_eq!(without_list.primary_email(), "");
    }

    #[test]
    fn test_user_requires_id() {
        let result = serde_json::from_value::<UserData>(json!({"email_addresses": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_workspace_requires_creator() {
        let org: OrganizationData = serde_json::from_value(json!({
            "id": "org_1",
            "name": "Engines",
            "slug": "engines"
        }))
        .unwrap();
        assert!(matches!(org.to_workspace(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_image_url_becomes_none() {
        let org: OrganizationData = serde_json::from_value(json!({
            "id": "org_1",
            "name": "Engines",
            "slug": "engines",
            "created_by": "user_1",
            "image_url": ""
        }))
        .unwrap();
        let workspace = org.to_workspace().unwrap();
        assert_eq!(workspace.owner_id, "user_1");
        assert_eq!(workspace.image_url, None);
    }

    #[test]
    fn test_invitation_role_alias() {
        let accepted: InvitationAccepted = serde_json::from_value(json!({
            "user_id": "user_2",
            "organization_id": "org_1",
            "role": "org:member"
        }))
        .unwrap();
        assert_eq!(accepted.to_member().role, "ORG:MEMBER");
    }
}
