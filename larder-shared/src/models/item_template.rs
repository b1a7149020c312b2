/// Per-user grocery item memory for autocomplete
///
/// Every time a user adds or edits a grocery item, the template for that
/// item's normalized name is upserted: display name, unit, and category are
/// refreshed and `use_count` goes up. Autocomplete then ranks by how often
/// and how recently an item was used.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_item_templates (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     normalized_name VARCHAR(255) NOT NULL,
///     display_name VARCHAR(255) NOT NULL,
///     unit measurement_unit,
///     category grocery_category NOT NULL DEFAULT 'other',
///     use_count INTEGER NOT NULL DEFAULT 1,
///     last_used_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT user_item_templates_name_unique UNIQUE (user_id, normalized_name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::category::GroceryCategory;
use super::unit::MeasurementUnit;

/// Default autocomplete result count
pub const DEFAULT_SUGGESTIONS: i64 = 10;

/// Upper bound on autocomplete result count
pub const MAX_SUGGESTIONS: i64 = 25;

/// Lowercases, trims, and collapses inner whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Clamps a requested suggestion count into `1..=MAX_SUGGESTIONS`
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_SUGGESTIONS).clamp(1, MAX_SUGGESTIONS)
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Remembered grocery item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserItemTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub normalized_name: String,
    pub display_name: String,
    pub unit: Option<MeasurementUnit>,
    pub category: GroceryCategory,
    pub use_count: i32,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

const TEMPLATE_COLUMNS: &str = "id, user_id, normalized_name, display_name, unit, category, \
                                use_count, last_used_at, created_at";

impl UserItemTemplate {
    /// Records one use of an item name
    ///
    /// Returns `None` when the name normalizes to nothing.
    pub async fn record_use(
        pool: &PgPool,
        user_id: Uuid,
        display_name: &str,
        unit: Option<MeasurementUnit>,
        category: GroceryCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        let normalized = normalize_name(display_name);
        if normalized.is_empty() {
            return Ok(None);
        }

        let query = format!(
            r#"
            INSERT INTO user_item_templates (user_id, normalized_name, display_name, unit, category)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, normalized_name) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                unit = EXCLUDED.unit,
                category = EXCLUDED.category,
                use_count = user_item_templates.use_count + 1,
                last_used_at = NOW()
            RETURNING {TEMPLATE_COLUMNS}
            "#
        );

        let template = sqlx::query_as::<_, UserItemTemplate>(&query)
            .bind(user_id)
            .bind(&normalized)
            .bind(display_name.trim())
            .bind(unit)
            .bind(category)
            .fetch_one(pool)
            .await?;

        Ok(Some(template))
    }

    /// Suggestions whose normalized name starts with `prefix`
    ///
    /// An empty prefix returns the user's most used items.
    pub async fn autocomplete(
        pool: &PgPool,
        user_id: Uuid,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("{}%", escape_like(&normalize_name(prefix)));

        let query = format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM user_item_templates
            WHERE user_id = $1 AND normalized_name LIKE $2
            ORDER BY use_count DESC, last_used_at DESC
            LIMIT $3
            "#
        );

        sqlx::query_as::<_, UserItemTemplate>(&query)
            .bind(user_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Remembered categories for a set of normalized names
    pub async fn categories_for(
        pool: &PgPool,
        user_id: Uuid,
        normalized_names: &[String],
    ) -> Result<HashMap<String, GroceryCategory>, sqlx::Error> {
        if normalized_names.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (String, GroceryCategory)>(
            r#"
            SELECT normalized_name, category
            FROM user_item_templates
            WHERE user_id = $1 AND normalized_name = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(normalized_names)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Deletes one of the user's templates
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_item_templates WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
