/// Per-user overview
///
/// ```text
/// GET /v1/dashboard?days=7
/// ```
///
/// Counts of the caller's recipes, plans, and grocery lists, the meals on
/// their own plans for the next `days` days (today included, default 7,
/// max 31), and their lists with unpurchased item counts.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use larder_shared::{
    auth::middleware::AuthContext,
    models::{
        grocery_list::{GroceryList, GroceryListSummary},
        meal_plan::{MealPlan, UpcomingMeal},
        recipe::Recipe,
    },
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DAYS: i64 = 7;
pub const MAX_DAYS: i64 = 31;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<i64>,
}

impl DashboardQuery {
    fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardCounts {
    pub recipes: i64,
    pub meal_plans: i64,
    pub grocery_lists: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub upcoming_meals: Vec<UpcomingMeal>,
    pub grocery_lists: Vec<GroceryListSummary>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let from = Utc::now().date_naive();
    let to = from + Duration::days(query.days() - 1);

    let (recipes, meal_plans, grocery_lists) = tokio::try_join!(
        Recipe::count_for_user(&state.db, auth.user_id),
        MealPlan::count_for_user(&state.db, auth.user_id),
        GroceryList::count_for_user(&state.db, auth.user_id),
    )?;

    let upcoming_meals = MealPlan::upcoming_meals(&state.db, auth.user_id, from, to).await?;
    let lists = GroceryList::summaries_for_owner(&state.db, auth.user_id).await?;

    Ok(Json(DashboardResponse {
        counts: DashboardCounts {
            recipes,
            meal_plans,
            grocery_lists,
        },
        from,
        to,
        upcoming_meals,
        grocery_lists: lists,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_clamped() {
        assert_eq!(DashboardQuery::default().days(), DEFAULT_DAYS);
        assert_eq!(DashboardQuery { days: Some(90) }.days(), MAX_DAYS);
        assert_eq!(DashboardQuery { days: Some(-3) }.days(), 1);
    }
}
