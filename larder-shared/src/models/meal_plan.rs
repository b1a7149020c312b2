/// Meal plans and their recipe assignments
///
/// A meal plan covers an inclusive date range of at most [`MAX_PLAN_DAYS`]
/// days. Each assignment places one recipe on one date and meal slot, with an
/// optional servings override used when building grocery lists.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE meal_plans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     CHECK (start_date <= end_date)
/// );
///
/// CREATE TABLE meal_assignments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     meal_plan_id UUID NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
///     recipe_id UUID NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     date DATE NOT NULL,
///     meal_type meal_type NOT NULL,
///     servings INTEGER CHECK (servings BETWEEN 1 AND 100),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT meal_assignments_slot_unique UNIQUE (meal_plan_id, date, meal_type, recipe_id)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::content_share::{ContentShare, ShareableType};

/// Longest plan, in days, counting both ends
pub const MAX_PLAN_DAYS: i64 = 62;

/// Meal slot within a day
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealType {
    /// All slots in day order
    pub const ALL: [MealType; 5] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
        MealType::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Dessert => "dessert",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date checks for plans and assignments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanDateError {
    #[error("start_date must be on or before end_date")]
    StartAfterEnd,

    #[error("Meal plan spans {days} days; the maximum is {MAX_PLAN_DAYS}")]
    TooLong { days: i64 },

    #[error("Date {date} is outside the meal plan ({start} to {end})")]
    OutsidePlan {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Validates a plan's date range
pub fn check_plan_range(start: NaiveDate, end: NaiveDate) -> Result<(), PlanDateError> {
    if start > end {
        return Err(PlanDateError::StartAfterEnd);
    }

    let days = (end - start).num_days() + 1;
    if days > MAX_PLAN_DAYS {
        return Err(PlanDateError::TooLong { days });
    }

    Ok(())
}

/// Meal plan row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
}

/// Assignment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MealAssignment {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub recipe_id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,

    /// Overrides the recipe's servings when set
    pub servings: Option<i32>,

    pub created_at: DateTime<Utc>,
}

/// Assignment joined with the recipe title, for plan views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignmentWithRecipe {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub recipe_title: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub servings: Option<i32>,
}

/// Input for placing a recipe on a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignment {
    pub recipe_id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub servings: Option<i32>,
}

/// A meal on the dashboard's upcoming list
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UpcomingMeal {
    pub assignment_id: Uuid,
    pub meal_plan_id: Uuid,
    pub meal_plan_name: String,
    pub recipe_id: Uuid,
    pub recipe_title: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub servings: Option<i32>,
}

const PLAN_COLUMNS: &str =
    "id, user_id, name, start_date, end_date, notes, created_at, updated_at, deleted_at";

impl MealPlan {
    /// Whether `date` falls inside the plan
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Checks that an assignment date falls inside the plan
    pub fn check_date(&self, date: NaiveDate) -> Result<(), PlanDateError> {
        if self.contains(date) {
            Ok(())
        } else {
            Err(PlanDateError::OutsidePlan {
                date,
                start: self.start_date,
                end: self.end_date,
            })
        }
    }

    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        input: MealPlanInput,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO meal_plans (user_id, name, start_date, end_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PLAN_COLUMNS}
            "#
        );

        sqlx::query_as::<_, MealPlan>(&query)
            .bind(user_id)
            .bind(input.name)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.notes)
            .fetch_one(pool)
            .await
    }

    /// Finds a live plan
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {PLAN_COLUMNS} FROM meal_plans WHERE id = $1 AND deleted_at IS NULL");

        sqlx::query_as::<_, MealPlan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a plan's fields
    ///
    /// Assignments that fall outside a shrunk range are removed in the same
    /// transaction.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: MealPlanInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            UPDATE meal_plans
            SET name = $2, start_date = $3, end_date = $4, notes = $5, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PLAN_COLUMNS}
            "#
        );

        let plan = sqlx::query_as::<_, MealPlan>(&query)
            .bind(id)
            .bind(input.name)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.notes)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(plan) = &plan {
            let removed = sqlx::query(
                "DELETE FROM meal_assignments WHERE meal_plan_id = $1 AND (date < $2 OR date > $3)",
            )
            .bind(plan.id)
            .bind(plan.start_date)
            .bind(plan.end_date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if removed > 0 {
                tracing::debug!(meal_plan_id = %plan.id, removed, "Dropped assignments outside new range");
            }
        }

        tx.commit().await?;
        Ok(plan)
    }

    /// Lists plans the user owns or has been shared, latest start first
    pub async fn list_accessible(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM meal_plans p
            WHERE p.deleted_at IS NULL
              AND (p.user_id = $1 OR EXISTS (
                    SELECT 1 FROM content_shares s
                    WHERE s.recipient_id = $1 AND s.shareable_type = 'meal_plan'
                      AND s.shareable_id = p.id))
            ORDER BY p.start_date DESC, p.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );

        sqlx::query_as::<_, MealPlan>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM meal_plans WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Soft-deletes a plan and drops its share grants
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE meal_plans SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        ContentShare::delete_for_resource(pool, ShareableType::MealPlan, id).await?;
        Ok(true)
    }

    /// Hard-deletes plans soft-deleted before `cutoff`
    pub async fn purge_deleted(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM meal_plans WHERE deleted_at IS NOT NULL AND deleted_at < $1")
                .bind(cutoff)
                .execute(pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Assignments on a plan with their recipe titles, by date then slot
    ///
    /// Assignments whose recipe was soft-deleted are hidden.
    pub async fn assignments(
        pool: &PgPool,
        plan_id: Uuid,
    ) -> Result<Vec<AssignmentWithRecipe>, sqlx::Error> {
        sqlx::query_as::<_, AssignmentWithRecipe>(
            r#"
            SELECT a.id, a.recipe_id, r.title AS recipe_title, a.date, a.meal_type, a.servings
            FROM meal_assignments a
            JOIN recipes r ON r.id = a.recipe_id AND r.deleted_at IS NULL
            WHERE a.meal_plan_id = $1
            ORDER BY a.date ASC, a.meal_type ASC, r.title ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await
    }

    /// Places a recipe on a plan
    ///
    /// # Errors
    ///
    /// A unique violation (`meal_assignments_slot_unique`) when the recipe is
    /// already in that slot.
    pub async fn add_assignment(
        pool: &PgPool,
        plan_id: Uuid,
        data: CreateAssignment,
    ) -> Result<MealAssignment, sqlx::Error> {
        let assignment = sqlx::query_as::<_, MealAssignment>(
            r#"
            INSERT INTO meal_assignments (meal_plan_id, recipe_id, date, meal_type, servings)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, meal_plan_id, recipe_id, date, meal_type, servings, created_at
            "#,
        )
        .bind(plan_id)
        .bind(data.recipe_id)
        .bind(data.date)
        .bind(data.meal_type)
        .bind(data.servings)
        .fetch_one(pool)
        .await?;

        sqlx::query("UPDATE meal_plans SET updated_at = NOW() WHERE id = $1")
            .bind(plan_id)
            .execute(pool)
            .await?;

        Ok(assignment)
    }

    pub async fn remove_assignment(
        pool: &PgPool,
        plan_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM meal_assignments WHERE id = $1 AND meal_plan_id = $2")
                .bind(assignment_id)
                .bind(plan_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Meals on the user's own plans between two dates, inclusive
    pub async fn upcoming_meals(
        pool: &PgPool,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<UpcomingMeal>, sqlx::Error> {
        sqlx::query_as::<_, UpcomingMeal>(
            r#"
            SELECT a.id AS assignment_id, p.id AS meal_plan_id, p.name AS meal_plan_name,
                   r.id AS recipe_id, r.title AS recipe_title, a.date, a.meal_type, a.servings
            FROM meal_assignments a
            JOIN meal_plans p ON p.id = a.meal_plan_id AND p.deleted_at IS NULL
            JOIN recipes r ON r.id = a.recipe_id AND r.deleted_at IS NULL
            WHERE p.user_id = $1 AND a.date BETWEEN $2 AND $3
            ORDER BY a.date ASC, a.meal_type ASC, r.title ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}
