/// Authorization policy for owned and shared records
///
/// Every recipe, meal plan, and grocery list has exactly one owner. Other
/// users reach a record only through a [`ContentShare`] grant.
///
/// # Permission Model
///
/// | Action | Owner | Share `edit` | Share `view` | Anyone else |
/// |--------|-------|--------------|--------------|-------------|
/// | View   | yes   | yes          | yes          | no          |
/// | Edit   | yes   | yes          | no           | no          |
/// | Delete | yes   | no           | no           | no          |
/// | Share  | yes   | no           | no           | no          |
///
/// The decision itself ([`decide`]) is pure; [`require_access`] adds the
/// share lookup.
///
/// # Example
///
/// ```no_run
/// use larder_shared::auth::authorization::{require_access, Action};
/// use larder_shared::auth::middleware::AuthContext;
/// use larder_shared::models::content_share::ShareableType;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// async fn check(pool: &PgPool, auth: &AuthContext, recipe_id: Uuid, owner_id: Uuid)
///     -> Result<(), Box<dyn std::error::Error>>
/// {
///     require_access(pool, auth, ShareableType::Recipe, recipe_id, owner_id, Action::Edit).await?;
///     Ok(())
/// }
/// ```

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::content_share::{ContentShare, SharePermission, ShareableType};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller may not perform the action on this resource
    #[error("Not authorized to {action} this {resource}")]
    NotAuthorized {
        action: Action,
        resource: ShareableType,
    },

    /// Database error while looking up shares
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Delete,
    Share,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Share => "share",
        };
        f.write_str(s)
    }
}

/// How the caller relates to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "permission")]
pub enum Access {
    Owner,
    Shared(SharePermission),
    None,
}

impl Access {
    /// Resolves the caller's relation from ownership and an optional grant
    pub fn resolve(actor_id: Uuid, owner_id: Uuid, share: Option<SharePermission>) -> Self {
        if actor_id == owner_id {
            Access::Owner
        } else {
            match share {
                Some(permission) => Access::Shared(permission),
                None => Access::None,
            }
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Access::Owner)
    }
}

/// Pure policy decision
pub fn allows(access: Access, action: Action) -> bool {
    match (access, action) {
        (Access::Owner, _) => true,
        (Access::Shared(_), Action::View) => true,
        (Access::Shared(permission), Action::Edit) => permission.allows_edit(),
        (Access::Shared(_), Action::Delete | Action::Share) => false,
        (Access::None, _) => false,
    }
}

/// Applies the policy and converts a denial into an error
pub fn decide(access: Access, action: Action, resource: ShareableType) -> Result<(), AuthzError> {
    if allows(access, action) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized { action, resource })
    }
}

/// Checks the caller owns the resource
///
/// Used for owner-only operations (delete, share, share links) where no share
/// lookup is needed.
pub fn require_ownership(
    auth: &AuthContext,
    owner_id: Uuid,
    action: Action,
    resource: ShareableType,
) -> Result<(), AuthzError> {
    decide(Access::resolve(auth.user_id, owner_id, None), action, resource)
}

/// Looks up the caller's relation to a resource
///
/// Skips the share query when the caller is the owner.
pub async fn resolve_access(
    pool: &PgPool,
    auth: &AuthContext,
    resource: ShareableType,
    resource_id: Uuid,
    owner_id: Uuid,
) -> Result<Access, AuthzError> {
    if auth.user_id == owner_id {
        return Ok(Access::Owner);
    }

    let share = ContentShare::find_permission(pool, auth.user_id, resource, resource_id).await?;
    Ok(Access::resolve(auth.user_id, owner_id, share))
}

/// Checks the caller may perform `action` on a resource
///
/// Returns the resolved [`Access`] so handlers can report it back.
///
/// # Errors
///
/// `AuthzError::NotAuthorized` when the policy denies the action.
pub async fn require_access(
    pool: &PgPool,
    auth: &AuthContext,
    resource: ShareableType,
    resource_id: Uuid,
    owner_id: Uuid,
    action: Action,
) -> Result<Access, AuthzError> {
    let access = resolve_access(pool, auth, resource, resource_id, owner_id).await?;
    decide(access, action, resource)?;
    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 4] = [Action::View, Action::Edit, Action::Delete, Action::Share];

    #[test]
    fn test_owner_can_do_everything() {
        for action in ALL_ACTIONS {
            assert!(allows(Access::Owner, action), "owner denied {action}");
        }
    }

    #[test]
    fn test_edit_share_cannot_delete_or_reshare() {
        let access = Access::Shared(SharePermission::Edit);
        assert!(allows(access, Action::View));
        assert!(allows(access, Action::Edit));
        assert!(!allows(access, Action::Delete));
        assert!(!allows(access, Action::Share));
    }

    #[test]
    fn test_view_share_is_read_only() {
        let access = Access::Shared(SharePermission::View);
        assert!(allows(access, Action::View));
        assert!(!allows(access, Action::Edit));
        assert!(!allows(access, Action::Delete));
    }

    #[test]
    fn test_stranger_denied() {
        for action in ALL_ACTIONS {
            assert!(!allows(Access::None, action));
        }
    }

    #[test]
    fn test_resolve_prefers_ownership() {
        let me = Uuid::new_v4();
        assert_eq!(Access::resolve(me, me, Some(SharePermission::View)), Access::Owner);
        assert_eq!(
            Access::resolve(me, Uuid::new_v4(), Some(SharePermission::Edit)),
            Access::Shared(SharePermission::Edit)
        );
        assert_eq!(Access::resolve(me, Uuid::new_v4(), None), Access::None);
    }

    #[test]
    fn test_require_ownership() {
        let user_id = Uuid::new_v4();
        let auth = AuthContext::new(user_id);

        assert!(require_ownership(&auth, user_id, Action::Delete, ShareableType::Recipe).is_ok());

        let err = require_ownership(&auth, Uuid::new_v4(), Action::Delete, ShareableType::Recipe)
            .unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to delete this recipe");
    }
}
