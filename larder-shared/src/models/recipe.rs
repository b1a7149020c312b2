/// Recipe model and database operations
///
/// A recipe owns an ordered list of ingredients and an ordered list of steps.
/// Both lists are written together with the recipe row in one transaction and
/// are replaced wholesale on update.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     source_url VARCHAR(2048),
///     image_url VARCHAR(2048),
///     servings INTEGER NOT NULL DEFAULT 1 CHECK (servings BETWEEN 1 AND 100),
///     prep_minutes INTEGER CHECK (prep_minutes BETWEEN 0 AND 2880),
///     cook_minutes INTEGER CHECK (cook_minutes BETWEEN 0 AND 2880),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE TABLE recipe_ingredients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     quantity DOUBLE PRECISION CHECK (quantity > 0),
///     unit measurement_unit,
///     category grocery_category,
///     note VARCHAR(255)
/// );
///
/// CREATE TABLE recipe_steps (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL,
///     instruction TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use larder_shared::models::recipe::{IngredientInput, Recipe, RecipeInput};
/// use larder_shared::models::unit::MeasurementUnit;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let detail = Recipe::create(&pool, user_id, RecipeInput {
///     title: "Pancakes".to_string(),
///     servings: 4,
///     ingredients: vec![IngredientInput {
///         name: "flour".to_string(),
///         quantity: Some(2.0),
///         unit: Some(MeasurementUnit::Cup),
///         category: None,
///         note: None,
///     }],
///     steps: vec!["Mix everything.".to_string()],
///     ..Default::default()
/// }).await?;
///
/// assert_eq!(detail.ingredients.len(), 1);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::category::GroceryCategory;
use super::content_share::{ContentShare, ShareableType};
use super::unit::MeasurementUnit;

/// Recipe row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    pub title: String,
    pub description: Option<String>,

    /// Page the recipe was imported from or credits
    pub source_url: Option<String>,

    pub image_url: Option<String>,

    /// Servings the ingredient quantities are written for
    pub servings: i32,

    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Ingredient row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub position: i32,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: Option<GroceryCategory>,
    pub note: Option<String>,
}

/// Step row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Step {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub position: i32,
    pub instruction: String,
}

/// Recipe with its ingredients and steps in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
}

/// Ingredient to write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub category: Option<GroceryCategory>,
    pub note: Option<String>,
}

/// Full recipe payload for create and update
///
/// Values are expected to be validated and sanitized already.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInput {
    pub title: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
    pub servings: i32,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub ingredients: Vec<IngredientInput>,
    pub steps: Vec<String>,
}

impl Default for RecipeInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            source_url: None,
            image_url: None,
            servings: 1,
            prep_minutes: None,
            cook_minutes: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
        }
    }
}

const RECIPE_COLUMNS: &str = "id, user_id, title, description, source_url, image_url, servings, \
                              prep_minutes, cook_minutes, created_at, updated_at, deleted_at";

impl Recipe {
    /// Creates a recipe with its ingredients and steps
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is written in that case.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        input: RecipeInput,
    ) -> Result<RecipeDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO recipes (user_id, title, description, source_url, image_url,
                                 servings, prep_minutes, cook_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RECIPE_COLUMNS}
            "#
        );

        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.source_url)
            .bind(&input.image_url)
            .bind(input.servings)
            .bind(input.prep_minutes)
            .bind(input.cook_minutes)
            .fetch_one(&mut *tx)
            .await?;

        let (ingredients, steps) = insert_children(&mut tx, recipe.id, &input).await?;

        tx.commit().await?;

        tracing::debug!(recipe_id = %recipe.id, user_id = %user_id, "Recipe created");

        Ok(RecipeDetail {
            recipe,
            ingredients,
            steps,
        })
    }

    /// Finds a live (not soft-deleted) recipe
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND deleted_at IS NULL");

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads a recipe with its ingredients and steps
    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let Some(recipe) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let ingredients = Self::ingredients(pool, id).await?;
        let steps = Self::steps(pool, id).await?;

        Ok(Some(RecipeDetail {
            recipe,
            ingredients,
            steps,
        }))
    }

    pub async fn ingredients(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<Ingredient>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, recipe_id, position, name, quantity, unit, category, note
            FROM recipe_ingredients
            WHERE recipe_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await
    }

    pub async fn steps(pool: &PgPool, recipe_id: Uuid) -> Result<Vec<Step>, sqlx::Error> {
        sqlx::query_as::<_, Step>(
            r#"
            SELECT id, recipe_id, position, instruction
            FROM recipe_steps
            WHERE recipe_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await
    }

    /// Replaces a recipe's fields, ingredients, and steps
    ///
    /// Returns `None` when the recipe does not exist or is soft-deleted.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: RecipeInput,
    ) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            UPDATE recipes
            SET title = $2, description = $3, source_url = $4, image_url = $5,
                servings = $6, prep_minutes = $7, cook_minutes = $8, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {RECIPE_COLUMNS}
            "#
        );

        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.source_url)
            .bind(&input.image_url)
            .bind(input.servings)
            .bind(input.prep_minutes)
            .bind(input.cook_minutes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(recipe) = recipe else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM recipe_steps WHERE recipe_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let (ingredients, steps) = insert_children(&mut tx, id, &input).await?;

        tx.commit().await?;

        Ok(Some(RecipeDetail {
            recipe,
            ingredients,
            steps,
        }))
    }

    /// Lists recipes the user owns or has been shared, newest first
    ///
    /// `search` matches the title case-insensitively.
    pub async fn list_accessible(
        pool: &PgPool,
        user_id: Uuid,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {RECIPE_COLUMNS}
            FROM recipes r
            WHERE r.deleted_at IS NULL
              AND (r.user_id = $1 OR EXISTS (
                    SELECT 1 FROM content_shares s
                    WHERE s.recipient_id = $1 AND s.shareable_type = 'recipe'
                      AND s.shareable_id = r.id))
              AND ($2::TEXT IS NULL OR r.title ILIKE '%' || $2 || '%')
            ORDER BY r.updated_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .bind(search.map(str::trim).filter(|s| !s.is_empty()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counts live recipes owned by a user
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recipes WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Soft-deletes a recipe and drops its share grants
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recipes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        ContentShare::delete_for_resource(pool, ShareableType::Recipe, id).await?;
        Ok(true)
    }

    /// Hard-deletes recipes soft-deleted before `cutoff`
    pub async fn purge_deleted(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE deleted_at IS NOT NULL AND deleted_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

async fn insert_children(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    input: &RecipeInput,
) -> Result<(Vec<Ingredient>, Vec<Step>), sqlx::Error> {
    let mut ingredients = Vec::with_capacity(input.ingredients.len());
    for (position, ingredient) in input.ingredients.iter().enumerate() {
        let row = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, position, name, quantity, unit, category, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, recipe_id, position, name, quantity, unit, category, note
            "#,
        )
        .bind(recipe_id)
        .bind(position as i32)
        .bind(&ingredient.name)
        .bind(ingredient.quantity)
        .bind(ingredient.unit)
        .bind(ingredient.category)
        .bind(&ingredient.note)
        .fetch_one(&mut **tx)
        .await?;
        ingredients.push(row);
    }

    let mut steps = Vec::with_capacity(input.steps.len());
    for (position, instruction) in input.steps.iter().enumerate() {
        let row = sqlx::query_as::<_, Step>(
            r#"
            INSERT INTO recipe_steps (recipe_id, position, instruction)
            VALUES ($1, $2, $3)
            RETURNING id, recipe_id, position, instruction
            "#,
        )
        .bind(recipe_id)
        .bind(position as i32)
        .bind(instruction)
        .fetch_one(&mut **tx)
        .await?;
        steps.push(row);
    }

    Ok((ingredients, steps))
}
