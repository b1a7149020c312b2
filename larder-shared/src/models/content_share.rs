/// Content shares between users
///
/// A share grants one recipient `view` or `edit` access to a single recipe,
/// meal plan, or grocery list owned by someone else. Shares are polymorphic
/// (type + id) so they carry no foreign key to the shared row; deleting the
/// resource removes its shares explicitly.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE content_shares (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     recipient_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     shareable_type shareable_type NOT NULL,
///     shareable_id UUID NOT NULL,
///     permission share_permission NOT NULL DEFAULT 'view',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (recipient_id, shareable_type, shareable_id),
///     CHECK (owner_id <> recipient_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Access level granted by a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    /// Read-only access
    View,

    /// Read and modify (never delete or re-share)
    Edit,
}

impl SharePermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharePermission::View => "view",
            SharePermission::Edit => "edit",
        }
    }

    /// Whether this grant allows modifying the resource
    pub fn allows_edit(&self) -> bool {
        matches!(self, SharePermission::Edit)
    }
}

/// Kinds of records that can be shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shareable_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShareableType {
    Recipe,
    MealPlan,
    GroceryList,
}

impl ShareableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareableType::Recipe => "recipe",
            ShareableType::MealPlan => "meal_plan",
            ShareableType::GroceryList => "grocery_list",
        }
    }
}

impl fmt::Display for ShareableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareableType {
    type Err = String;

    /// Accepts both `meal_plan` and the URL-style `meal-plans`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").trim_end_matches('s') {
            "recipe" => Ok(ShareableType::Recipe),
            "meal_plan" => Ok(ShareableType::MealPlan),
            "grocery_list" => Ok(ShareableType::GroceryList),
            other => Err(format!("Unknown shareable type: {}", other)),
        }
    }
}

/// A share grant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentShare {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipient_id: Uuid,
    pub shareable_type: ShareableType,
    pub shareable_id: Uuid,
    pub permission: SharePermission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A share grant joined with the recipient's identity, for the owner's view
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentShareWithRecipient {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub permission: SharePermission,
    pub created_at: DateTime<Utc>,
}

/// Input for granting (or re-granting) a share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentShare {
    pub owner_id: Uuid,
    pub recipient_id: Uuid,
    pub shareable_type: ShareableType,
    pub shareable_id: Uuid,
    pub permission: SharePermission,
}

const SHARE_COLUMNS: &str = "id, owner_id, recipient_id, shareable_type, shareable_id, \
                             permission, created_at, updated_at";

impl ContentShare {
    /// Grants a share, or updates the permission of an existing one
    pub async fn upsert(pool: &PgPool, data: CreateContentShare) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO content_shares (owner_id, recipient_id, shareable_type, shareable_id, permission)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (recipient_id, shareable_type, shareable_id)
            DO UPDATE SET permission = EXCLUDED.permission, updated_at = NOW()
            RETURNING {SHARE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ContentShare>(&query)
            .bind(data.owner_id)
            .bind(data.recipient_id)
            .bind(data.shareable_type)
            .bind(data.shareable_id)
            .bind(data.permission)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {SHARE_COLUMNS} FROM content_shares WHERE id = $1");

        sqlx::query_as::<_, ContentShare>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Permission `recipient_id` holds on a resource, if any
    pub async fn find_permission(
        pool: &PgPool,
        recipient_id: Uuid,
        shareable_type: ShareableType,
        shareable_id: Uuid,
    ) -> Result<Option<SharePermission>, sqlx::Error> {
        sqlx::query_scalar::<_, SharePermission>(
            r#"
            SELECT permission
            FROM content_shares
            WHERE recipient_id = $1 AND shareable_type = $2 AND shareable_id = $3
            "#,
        )
        .bind(recipient_id)
        .bind(shareable_type)
        .bind(shareable_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists grants on a resource with recipient details
    pub async fn list_for_resource(
        pool: &PgPool,
        shareable_type: ShareableType,
        shareable_id: Uuid,
    ) -> Result<Vec<ContentShareWithRecipient>, sqlx::Error> {
        sqlx::query_as::<_, ContentShareWithRecipient>(
            r#"
            SELECT s.id, s.recipient_id, u.email::TEXT AS recipient_email,
                   u.name AS recipient_name, s.permission, s.created_at
            FROM content_shares s
            JOIN users u ON u.id = s.recipient_id
            WHERE s.shareable_type = $1 AND s.shareable_id = $2
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(shareable_type)
        .bind(shareable_id)
        .fetch_all(pool)
        .await
    }

    /// Lists everything shared with a user, newest first
    pub async fn list_received(pool: &PgPool, recipient_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {SHARE_COLUMNS} FROM content_shares WHERE recipient_id = $1 ORDER BY created_at DESC"
        );

        sqlx::query_as::<_, ContentShare>(&query)
            .bind(recipient_id)
            .fetch_all(pool)
            .await
    }

    /// Revokes a grant; only the owner's grants match
    pub async fn delete_owned(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM content_shares WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every grant on a resource
    pub async fn delete_for_resource(
        pool: &PgPool,
        shareable_type: ShareableType,
        shareable_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM content_shares WHERE shareable_type = $1 AND shareable_id = $2",
        )
        .bind(shareable_type)
        .bind(shareable_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shareable_type_from_str() {
        assert_eq!("recipe".parse::<ShareableType>(), Ok(ShareableType::Recipe));
        assert_eq!("recipes".parse::<ShareableType>(), Ok(ShareableType::Recipe));
        assert_eq!("meal-plans".parse::<ShareableType>(), Ok(ShareableType::MealPlan));
        assert_eq!("grocery_list".parse::<ShareableType>(), Ok(ShareableType::GroceryList));
        assert!("pantry".parse::<ShareableType>().is_err());
    }

    #[test]
    fn test_permission_allows_edit() {
        assert!(SharePermission::Edit.allows_edit());
        assert!(!SharePermission::View.allows_edit());
    }

    #[test]
    fn test_permission_serde() {
        let json = serde_json::to_string(&SharePermission::Edit).unwrap();
        assert_eq!(json, "\"edit\"");
        let parsed: ShareableType = serde_json::from_str("\"meal_plan\"").unwrap();
        assert_eq!(parsed, ShareableType::MealPlan);
    }
}
