/// Grocery lists, their items, and public share links
///
/// A list is either written by hand or generated from a meal plan (see
/// [`crate::grocery`]). The owner can publish a read-only link: a random
/// token stored on the list with an optional expiry. Anyone holding the token
/// can view the list until it expires, is revoked, or the list is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE grocery_lists (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     meal_plan_id UUID REFERENCES meal_plans(id) ON DELETE SET NULL,
///     name VARCHAR(255) NOT NULL,
///     share_token VARCHAR(64) UNIQUE,
///     share_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE TABLE grocery_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     grocery_list_id UUID NOT NULL REFERENCES grocery_lists(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     quantity DOUBLE PRECISION CHECK (quantity > 0),
///     unit measurement_unit,
///     category grocery_category NOT NULL DEFAULT 'other',
///     purchased BOOLEAN NOT NULL DEFAULT FALSE,
///     notes VARCHAR(255),
///     source grocery_item_source NOT NULL DEFAULT 'manual',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use larder_shared::models::grocery_list::GroceryList;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let list = GroceryList::create(&pool, user_id, "Weekend", None).await?;
/// let shared = GroceryList::create_share_link(&pool, list.id, Some(7)).await?;
/// println!("/shared/grocery-lists/{}", shared.and_then(|l| l.share_token).unwrap_or_default());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::category::GroceryCategory;
use super::content_share::{ContentShare, ShareableType};
use super::unit::MeasurementUnit;

/// Length of public share tokens
pub const SHARE_TOKEN_LENGTH: usize = 40;

/// Longest share-link lifetime, in days
pub const MAX_SHARE_DAYS: i64 = 365;

/// Generates a random URL-safe share token
pub fn generate_share_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Where a grocery item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grocery_item_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Manual,
    MealPlan,
}

/// State of a list's public link at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareLinkState {
    Active,
    Expired,
}

/// Grocery list row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryList {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Plan this list was generated from
    pub meal_plan_id: Option<Uuid>,

    pub name: String,
    pub share_token: Option<String>,
    pub share_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// List row with item counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryListSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_plan_id: Option<Uuid>,
    pub name: String,
    pub item_count: i64,
    pub unpurchased_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grocery item row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryItem {
    pub id: Uuid,
    pub grocery_list_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: GroceryCategory,
    pub purchased: bool,
    pub notes: Option<String>,
    pub source: ItemSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item to insert or replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGroceryItem {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: GroceryCategory,
    pub notes: Option<String>,
    pub source: ItemSource,
}

const LIST_COLUMNS: &str = "id, user_id, meal_plan_id, name, share_token, share_expires_at, \
                            created_at, updated_at, deleted_at";

const ITEM_COLUMNS: &str = "id, grocery_list_id, name, quantity, unit, category, purchased, \
                            notes, source, created_at, updated_at";

impl GroceryList {
    /// State of the public link at `now`, if one exists
    pub fn share_link_state(&self, now: DateTime<Utc>) -> Option<ShareLinkState> {
        self.share_token.as_ref()?;

        match self.share_expires_at {
            Some(expires_at) if expires_at <= now => Some(ShareLinkState::Expired),
            _ => Some(ShareLinkState::Active),
        }
    }

    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
        meal_plan_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO grocery_lists (user_id, name, meal_plan_id)
            VALUES ($1, $2, $3)
            RETURNING {LIST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, GroceryList>(&query)
            .bind(user_id)
            .bind(name)
            .bind(meal_plan_id)
            .fetch_one(pool)
            .await
    }

    /// Creates a list and its items in one transaction
    pub async fn create_with_items(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
        meal_plan_id: Option<Uuid>,
        items: &[NewGroceryItem],
    ) -> Result<(Self, Vec<GroceryItem>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO grocery_lists (user_id, name, meal_plan_id)
            VALUES ($1, $2, $3)
            RETURNING {LIST_COLUMNS}
            "#
        );

        let list = sqlx::query_as::<_, GroceryList>(&query)
            .bind(user_id)
            .bind(name)
            .bind(meal_plan_id)
            .fetch_one(&mut *tx)
            .await?;

        let insert = format!(
            r#"
            INSERT INTO grocery_items (grocery_list_id, name, quantity, unit, category, notes, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        );

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, GroceryItem>(&insert)
                .bind(list.id)
                .bind(&item.name)
                .bind(item.quantity)
                .bind(item.unit)
                .bind(item.category)
                .bind(&item.notes)
                .bind(item.source)
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;

        Ok((list, rows))
    }

    /// Finds a live list
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE id = $1 AND deleted_at IS NULL"
        );

        sqlx::query_as::<_, GroceryList>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a live list by its public token, expired or not
    pub async fn find_by_share_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE share_token = $1 AND deleted_at IS NULL"
        );

        sqlx::query_as::<_, GroceryList>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE grocery_lists SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {LIST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, GroceryList>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Lists the user's own and shared lists with item counts
    pub async fn list_accessible(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GroceryListSummary>, sqlx::Error> {
        sqlx::query_as::<_, GroceryListSummary>(
            r#"
            SELECT l.id, l.user_id, l.meal_plan_id, l.name,
                   COUNT(i.id) AS item_count,
                   COUNT(i.id) FILTER (WHERE NOT i.purchased) AS unpurchased_count,
                   l.created_at, l.updated_at
            FROM grocery_lists l
            LEFT JOIN grocery_items i ON i.grocery_list_id = l.id
            WHERE l.deleted_at IS NULL
              AND (l.user_id = $1 OR EXISTS (
                    SELECT 1 FROM content_shares s
                    WHERE s.recipient_id = $1 AND s.shareable_type = 'grocery_list'
                      AND s.shareable_id = l.id))
            GROUP BY l.id
            ORDER BY l.updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// The user's own lists with unpurchased counts, for the dashboard
    pub async fn summaries_for_owner(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<GroceryListSummary>, sqlx::Error> {
        sqlx::query_as::<_, GroceryListSummary>(
            r#"
            SELECT l.id, l.user_id, l.meal_plan_id, l.name,
                   COUNT(i.id) AS item_count,
                   COUNT(i.id) FILTER (WHERE NOT i.purchased) AS unpurchased_count,
                   l.created_at, l.updated_at
            FROM grocery_lists l
            LEFT JOIN grocery_items i ON i.grocery_list_id = l.id
            WHERE l.user_id = $1 AND l.deleted_at IS NULL
            GROUP BY l.id
            ORDER BY l.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM grocery_lists WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Soft-deletes a list, revoking its link and share grants
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE grocery_lists
            SET deleted_at = NOW(), share_token = NULL, share_expires_at = NULL
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        ContentShare::delete_for_resource(pool, ShareableType::GroceryList, id).await?;
        Ok(true)
    }

    /// Hard-deletes lists soft-deleted before `cutoff`
    pub async fn purge_deleted(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM grocery_lists WHERE deleted_at IS NOT NULL AND deleted_at < $1")
                .bind(cutoff)
                .execute(pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Stores a fresh share token, replacing any existing one
    ///
    /// `expires_in_days` of `None` makes a link that never expires.
    pub async fn create_share_link(
        pool: &PgPool,
        id: Uuid,
        expires_in_days: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let token = generate_share_token();
        let expires_at = expires_in_days.map(|days| Utc::now() + Duration::days(days));

        let query = format!(
            r#"
            UPDATE grocery_lists
            SET share_token = $2, share_expires_at = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {LIST_COLUMNS}
            "#
        );

        let list = sqlx::query_as::<_, GroceryList>(&query)
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .fetch_optional(pool)
            .await?;

        if list.is_some() {
            tracing::info!(grocery_list_id = %id, expires_at = ?expires_at, "Share link created");
        }

        Ok(list)
    }

    pub async fn revoke_share_link(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE grocery_lists
            SET share_token = NULL, share_expires_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {LIST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, GroceryList>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Clears share tokens that expired at or before `cutoff`
    ///
    /// Pass a cutoff well in the past: a cleared token answers 404 instead of 410.
    pub async fn clear_expired_share_links(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE grocery_lists
            SET share_token = NULL, share_expires_at = NULL
            WHERE share_token IS NOT NULL AND share_expires_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn items(pool: &PgPool, list_id: Uuid) -> Result<Vec<GroceryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM grocery_items WHERE grocery_list_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, GroceryItem>(&query)
            .bind(list_id)
            .fetch_all(pool)
            .await
    }

    pub async fn add_item(
        pool: &PgPool,
        list_id: Uuid,
        item: &NewGroceryItem,
    ) -> Result<GroceryItem, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO grocery_items (grocery_list_id, name, quantity, unit, category, notes, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ITEM_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, GroceryItem>(&query)
            .bind(list_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit)
            .bind(item.category)
            .bind(&item.notes)
            .bind(item.source)
            .fetch_one(pool)
            .await?;

        touch(pool, list_id).await?;
        Ok(row)
    }

    /// Replaces an item's editable fields
    pub async fn update_item(
        pool: &PgPool,
        list_id: Uuid,
        item_id: Uuid,
        item: &NewGroceryItem,
        purchased: Option<bool>,
    ) -> Result<Option<GroceryItem>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE grocery_items
            SET name = $3, quantity = $4, unit = $5, category = $6, notes = $7,
                purchased = COALESCE($8, purchased), updated_at = NOW()
            WHERE id = $1 AND grocery_list_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, GroceryItem>(&query)
            .bind(item_id)
            .bind(list_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit)
            .bind(item.category)
            .bind(&item.notes)
            .bind(purchased)
            .fetch_optional(pool)
            .await?;

        if row.is_some() {
            touch(pool, list_id).await?;
        }
        Ok(row)
    }

    /// Flips an item's purchased flag
    pub async fn toggle_item(
        pool: &PgPool,
        list_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<GroceryItem>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE grocery_items
            SET purchased = NOT purchased, updated_at = NOW()
            WHERE id = $1 AND grocery_list_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        );

        sqlx::query_as::<_, GroceryItem>(&query)
            .bind(item_id)
            .bind(list_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_item(pool: &PgPool, list_id: Uuid, item_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM grocery_items WHERE id = $1 AND grocery_list_id = $2")
            .bind(item_id)
            .bind(list_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every purchased item, returning how many went
    pub async fn clear_purchased(pool: &PgPool, list_id: Uuid) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM grocery_items WHERE grocery_list_id = $1 AND purchased")
                .bind(list_id)
                .execute(pool)
                .await?;

        touch(pool, list_id).await?;
        Ok(result.rows_affected())
    }
}

async fn touch(pool: &PgPool, list_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE grocery_lists SET updated_at = NOW() WHERE id = $1")
        .bind(list_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(token: Option<&str>, expires_at: Option<DateTime<Utc>>) -> GroceryList {
        GroceryList {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            meal_plan_id: None,
            name: "Weekly".to_string(),
            share_token: token.map(str::to_string),
            share_expires_at: expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_share_token_shape() {
        let token = generate_share_token();
        assert_eq!(token.len(), SHARE_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_share_token());
    }

    #[test]
    fn test_share_link_state() {
        let now = Utc::now();

        assert_eq!(list(None, None).share_link_state(now), None);
        assert_eq!(
            list(Some("abc"), None).share_link_state(now),
            Some(ShareLinkState::Active)
        );
        assert_eq!(
            list(Some("abc"), Some(now + Duration::days(1))).share_link_state(now),
            Some(ShareLinkState::Active)
        );
        assert_eq!(
            list(Some("abc"), Some(now)).share_link_state(now),
            Some(ShareLinkState::Expired)
        );
    }

    #[test]
    fn test_item_source_serde() {
        assert_eq!(serde_json::to_string(&ItemSource::MealPlan).unwrap(), "\"meal_plan\"");
    }
}
