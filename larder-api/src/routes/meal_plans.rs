/// Meal plan endpoints
///
/// # Endpoints
///
/// - `POST /v1/meal-plans` - Create a plan
/// - `GET /v1/meal-plans` - List own and shared plans
/// - `GET /v1/meal-plans/:id` - Plan with its assignments
/// - `PUT /v1/meal-plans/:id` - Update (owner or `edit` share)
/// - `DELETE /v1/meal-plans/:id` - Soft-delete (owner only)
/// - `POST /v1/meal-plans/:id/assignments` - Place a recipe on a day and meal
/// - `DELETE /v1/meal-plans/:id/assignments/:assignment_id`
/// - `POST /v1/meal-plans/:id/grocery-list` - Generate a grocery list
///
/// A plan spans at most 62 days. Shrinking a plan drops assignments that no
/// longer fit.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{grocery_lists::GroceryListResponse, recipes::load_recipe, required_text, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use larder_shared::{
    auth::{
        authorization::{require_access, Access, Action},
        middleware::AuthContext,
    },
    grocery::generate_from_plan,
    models::{
        content_share::ShareableType,
        meal_plan::{
            check_plan_range, AssignmentWithRecipe, CreateAssignment, MealPlan, MealPlanInput,
            MealType,
        },
    },
    sanitize::clean_multiline,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const MAX_NAME_CHARS: usize = 255;
const MAX_NOTES_CHARS: usize = 2000;

/// Create/update meal plan request
#[derive(Debug, Deserialize, Validate)]
pub struct MealPlanRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

impl MealPlanRequest {
    fn into_input(self) -> ApiResult<MealPlanInput> {
        self.validate()?;
        check_plan_range(self.start_date, self.end_date)?;

        Ok(MealPlanInput {
            name: required_text("name", &self.name, MAX_NAME_CHARS)?,
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self
                .notes
                .as_deref()
                .map(|n| clean_multiline(n, MAX_NOTES_CHARS))
                .filter(|n| !n.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignmentRequest {
    pub recipe_id: Uuid,
    pub date: NaiveDate,
    pub meal_type: MealType,

    /// Overrides the recipe's servings when scaling groceries
    #[validate(range(min = 1, max = 100, message = "Servings must be between 1 and 100"))]
    pub servings: Option<i32>,
}

/// Optional date sub-range for grocery generation
///
/// A missing bound falls back to the plan's own start or end.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl GenerateRequest {
    fn range(&self, plan: &MealPlan) -> Option<(NaiveDate, NaiveDate)> {
        if self.start_date.is_none() && self.end_date.is_none() {
            return None;
        }
        Some((
            self.start_date.unwrap_or(plan.start_date),
            self.end_date.unwrap_or(plan.end_date),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct MealPlanListResponse {
    pub meal_plans: Vec<MealPlan>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct MealPlanResponse {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub assignments: Vec<AssignmentWithRecipe>,
    pub access: Access,
}

async fn load_plan(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<(MealPlan, Access)> {
    let plan = MealPlan::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Meal plan not found".to_string()))?;

    let access = require_access(
        &state.db,
        auth,
        ShareableType::MealPlan,
        plan.id,
        plan.user_id,
        action,
    )
    .await?;

    Ok((plan, access))
}

pub async fn create_meal_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<MealPlanRequest>,
) -> ApiResult<(StatusCode, Json<MealPlanResponse>)> {
    let input = req.into_input()?;
    let plan = MealPlan::create(&state.db, auth.user_id, input).await?;

    tracing::info!(meal_plan_id = %plan.id, user_id = %auth.user_id, "Meal plan created");

    Ok((
        StatusCode::CREATED,
        Json(MealPlanResponse {
            plan,
            assignments: Vec::new(),
            access: Access::Owner,
        }),
    ))
}

pub async fn list_meal_plans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<MealPlanListResponse>> {
    let (limit, offset) = (page.limit(), page.offset());
    let meal_plans = MealPlan::list_accessible(&state.db, auth.user_id, limit, offset).await?;

    Ok(Json(MealPlanListResponse {
        meal_plans,
        limit,
        offset,
    }))
}

pub async fn get_meal_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MealPlanResponse>> {
    let (plan, access) = load_plan(&state, &auth, id, Action::View).await?;
    let assignments = MealPlan::assignments(&state.db, plan.id).await?;

    Ok(Json(MealPlanResponse {
        plan,
        assignments,
        access,
    }))
}

/// Update a plan
///
/// Assignments outside the new date range are removed.
pub async fn update_meal_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MealPlanRequest>,
) -> ApiResult<Json<MealPlanResponse>> {
    let (_, access) = load_plan(&state, &auth, id, Action::Edit).await?;
    let input = req.into_input()?;

    let plan = MealPlan::update(&state.db, id, input)
        .await?
        .ok_or_else(|| ApiError::NotFound("Meal plan not found".to_string()))?;
    let assignments = MealPlan::assignments(&state.db, plan.id).await?;

    Ok(Json(MealPlanResponse {
        plan,
        assignments,
        access,
    }))
}

pub async fn delete_meal_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_plan(&state, &auth, id, Action::Delete).await?;

    if !MealPlan::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Meal plan not found".to_string()));
    }

    tracing::info!(meal_plan_id = %id, user_id = %auth.user_id, "Meal plan deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Place a recipe on the plan
///
/// The caller must be able to edit the plan and view the recipe.
///
/// # Errors
///
/// - `409 Conflict`: The recipe is already in that slot
/// - `422 Unprocessable Entity`: Date outside the plan
pub async fn add_assignment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignmentRequest>,
) -> ApiResult<(StatusCode, Json<AssignmentWithRecipe>)> {
    req.validate()?;

    let (plan, _) = load_plan(&state, &auth, id, Action::Edit).await?;
    plan.check_date(req.date)?;

    let (recipe, _) = load_recipe(&state, &auth, req.recipe_id, Action::View).await?;

    let assignment = MealPlan::add_assignment(
        &state.db,
        plan.id,
        CreateAssignment {
            recipe_id: recipe.id,
            date: req.date,
            meal_type: req.meal_type,
            servings: req.servings,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict(format!(
            "{} is already planned for {} on {}",
            recipe.title, req.meal_type, req.date
        )),
        other => other,
    })?;

    tracing::debug!(
        meal_plan_id = %plan.id,
        assignment_id = %assignment.id,
        recipe_id = %recipe.id,
        "Recipe assigned"
    );

    Ok((
        StatusCode::CREATED,
        Json(AssignmentWithRecipe {
            id: assignment.id,
            recipe_id: recipe.id,
            recipe_title: recipe.title,
            date: assignment.date,
            meal_type: assignment.meal_type,
            servings: assignment.servings,
        }),
    ))
}

pub async fn remove_assignment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, assignment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let (plan, _) = load_plan(&state, &auth, id, Action::Edit).await?;

    if !MealPlan::remove_assignment(&state.db, plan.id, assignment_id).await? {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Generate a grocery list from the plan
///
/// # Endpoint
///
/// ```text
/// POST /v1/meal-plans/:id/grocery-list
///
/// { "start_date": "2025-03-03", "end_date": "2025-03-05" }   (optional)
/// ```
///
/// The new list belongs to the caller, who needs view access to the plan.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: No recipes in range, or range outside the plan
pub async fn generate_grocery_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<GenerateRequest>>,
) -> ApiResult<(StatusCode, Json<GroceryListResponse>)> {
    let (plan, _) = load_plan(&state, &auth, id, Action::View).await?;
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let (list, items) = generate_from_plan(&state.db, &plan, auth.user_id, req.range(&plan)).await?;

    Ok((
        StatusCode::CREATED,
        Json(GroceryListResponse::new(list, items, Access::Owner)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan() -> MealPlan {
        MealPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "March".to_string(),
            start_date: date(2025, 3, 1),
            end_date: date(2025, 3, 14),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_generate_range_defaults_to_plan_bounds() {
        let plan = plan();

        assert_eq!(GenerateRequest::default().range(&plan), None);

        let req = GenerateRequest {
            start_date: Some(date(2025, 3, 5)),
            end_date: None,
        };
        assert_eq!(req.range(&plan), Some((date(2025, 3, 5), date(2025, 3, 14))));
    }

    #[test]
    fn test_plan_request_checks_range() {
        let req = MealPlanRequest {
            name: "Too long".to_string(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 6, 1),
            notes: None,
        };
        match req.into_input() {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "end_date"),
            other => panic!("unexpected result: {:?}", other.map(|i| i.name)),
        }

        let req = MealPlanRequest {
            name: "<i>Week</i> 1".to_string(),
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 7),
            notes: Some("   ".to_string()),
        };
        let input = req.into_input().unwrap();
        assert_eq!(input.name, "Week 1");
        assert_eq!(input.notes, None);
    }
}
