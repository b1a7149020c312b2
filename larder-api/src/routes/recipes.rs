/// Recipe endpoints
///
/// # Endpoints
///
/// - `POST /v1/recipes` - Create a recipe
/// - `GET /v1/recipes` - List own and shared recipes (`?q=&limit=&offset=`)
/// - `GET /v1/recipes/:id` - Recipe with ingredients and steps
/// - `PUT /v1/recipes/:id` - Replace a recipe (owner or `edit` share)
/// - `DELETE /v1/recipes/:id` - Soft-delete (owner only)
/// - `POST /v1/recipes/import` - Extract a recipe from a web page
///
/// All text input passes through the sanitizer before it is stored.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{optional_url, required_text, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use larder_shared::{
    auth::{
        authorization::{require_access, Access, Action},
        middleware::AuthContext,
    },
    ingredient::{parse_ingredient_line, quantity_in_range, MAX_NAME_CHARS, MAX_NOTE_CHARS},
    models::{
        category::GroceryCategory,
        content_share::ShareableType,
        recipe::{IngredientInput, Recipe, RecipeDetail, RecipeInput},
        unit::MeasurementUnit,
    },
    sanitize::{clean_multiline, clean_optional},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const MAX_TITLE_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_STEP_CHARS: usize = 5000;

fn default_servings() -> i32 {
    1
}

/// Create/update recipe request
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub source_url: Option<String>,

    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub image_url: Option<String>,

    #[serde(default = "default_servings")]
    #[validate(range(min = 1, max = 100, message = "Servings must be between 1 and 100"))]
    pub servings: i32,

    #[validate(range(min = 0, max = 2880, message = "Minutes must be between 0 and 2880"))]
    pub prep_minutes: Option<i32>,

    #[validate(range(min = 0, max = 2880, message = "Minutes must be between 0 and 2880"))]
    pub cook_minutes: Option<i32>,

    #[serde(default)]
    #[validate(length(max = 100, message = "At most 100 ingredients"))]
    pub ingredients: Vec<IngredientRequest>,

    #[serde(default)]
    #[validate(length(max = 100, message = "At most 100 steps"))]
    pub steps: Vec<String>,
}

/// One ingredient in a recipe request
///
/// Either structured fields, or a free-text `text` line such as
/// `"2 cups flour, sifted"` which is parsed when `name` is empty.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IngredientRequest {
    #[serde(default)]
    pub name: String,
    pub quantity: Option<f64>,

    /// Unit name or common alias ("cups", "Tbsp", "grams")
    pub unit: Option<String>,
    pub category: Option<GroceryCategory>,
    pub note: Option<String>,
    pub text: Option<String>,
}

impl IngredientRequest {
    fn into_input(self, index: usize) -> ApiResult<IngredientInput> {
        let field = |name: &str| format!("ingredients[{}].{}", index, name);

        let check_quantity = |quantity: Option<f64>| match quantity {
            Some(q) if !quantity_in_range(q) => Err(ApiError::invalid_field(
                field("quantity"),
                "Quantity must be greater than 0 and at most 100000",
            )),
            other => Ok(other),
        };

        if self.name.trim().is_empty() {
            if let Some(parsed) = self.text.as_deref().and_then(parse_ingredient_line) {
                let mut input = IngredientInput::from(parsed);
                input.quantity = check_quantity(input.quantity)?;
                input.category = self.category;
                return Ok(input);
            }
        }

        let name = required_text(&field("name"), &self.name, MAX_NAME_CHARS)?;
        let quantity = check_quantity(self.quantity)?;

        let unit = match self.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            None => None,
            Some(raw) => Some(MeasurementUnit::from_alias(raw).ok_or_else(|| {
                ApiError::invalid_field(field("unit"), format!("Unknown unit: {}", raw))
            })?),
        };

        Ok(IngredientInput {
            name,
            quantity,
            unit,
            category: self.category,
            note: clean_optional(self.note.as_deref(), MAX_NOTE_CHARS),
        })
    }
}

impl RecipeRequest {
    /// Validates and sanitizes the request into a storable recipe
    pub fn into_input(self) -> ApiResult<RecipeInput> {
        self.validate()?;

        let title = required_text("title", &self.title, MAX_TITLE_CHARS)?;
        let description = self
            .description
            .as_deref()
            .map(|d| clean_multiline(d, MAX_DESCRIPTION_CHARS))
            .filter(|d| !d.is_empty());
        let source_url = optional_url("source_url", self.source_url.as_deref())?;
        let image_url = optional_url("image_url", self.image_url.as_deref())?;

        let ingredients = self
            .ingredients
            .into_iter()
            .enumerate()
            .map(|(i, ingredient)| ingredient.into_input(i))
            .collect::<ApiResult<Vec<_>>>()?;

        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let cleaned = clean_multiline(step, MAX_STEP_CHARS);
            if cleaned.is_empty() {
                return Err(ApiError::invalid_field(
                    format!("steps[{}]", i),
                    "Step instruction is required",
                ));
            }
            steps.push(cleaned);
        }

        Ok(RecipeInput {
            title,
            description,
            source_url,
            image_url,
            servings: self.servings,
            prep_minutes: self.prep_minutes,
            cook_minutes: self.cook_minutes,
            ingredients,
            steps,
        })
    }
}

/// `GET /v1/recipes` query
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    /// Case-insensitive title search
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecipeListResponse {
    pub recipes: Vec<Recipe>,
    pub limit: i64,
    pub offset: i64,
}

/// Recipe detail plus the caller's relation to it
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    #[serde(flatten)]
    pub detail: RecipeDetail,
    pub access: Access,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    /// Create the recipe instead of only returning the draft
    #[serde(default)]
    pub save: bool,
}

/// Loads a live recipe and checks the caller may perform `action` on it
pub(crate) async fn load_recipe(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<(Recipe, Access)> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))?;

    let access = require_access(
        &state.db,
        auth,
        ShareableType::Recipe,
        recipe.id,
        recipe.user_id,
        action,
    )
    .await?;

    Ok((recipe, access))
}

/// Create a recipe
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeDetail>)> {
    let input = req.into_input()?;
    let detail = Recipe::create(&state.db, auth.user_id, input).await?;

    tracing::info!(recipe_id = %detail.recipe.id, user_id = %auth.user_id, "Recipe created");

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RecipeListQuery>,
) -> ApiResult<Json<RecipeListResponse>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let (limit, offset) = (page.limit(), page.offset());

    let recipes =
        Recipe::list_accessible(&state.db, auth.user_id, query.q.as_deref(), limit, offset).await?;

    Ok(Json(RecipeListResponse {
        recipes,
        limit,
        offset,
    }))
}

/// Get a recipe the caller owns or has been shared
///
/// # Errors
///
/// - `403 Forbidden`: No access
/// - `404 Not Found`: Missing or deleted
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecipeResponse>> {
    let (recipe, access) = load_recipe(&state, &auth, id, Action::View).await?;

    let ingredients = Recipe::ingredients(&state.db, recipe.id).await?;
    let steps = Recipe::steps(&state.db, recipe.id).await?;

    Ok(Json(RecipeResponse {
        detail: RecipeDetail {
            recipe,
            ingredients,
            steps,
        },
        access,
    }))
}

/// Replace a recipe
///
/// Ingredients and steps are replaced wholesale.
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    let (_, access) = load_recipe(&state, &auth, id, Action::Edit).await?;
    let input = req.into_input()?;

    let detail = Recipe::update(&state.db, id, input)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))?;

    tracing::debug!(recipe_id = %id, user_id = %auth.user_id, "Recipe updated");

    Ok(Json(RecipeResponse { detail, access }))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_recipe(&state, &auth, id, Action::Delete).await?;

    if !Recipe::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }

    tracing::info!(recipe_id = %id, user_id = %auth.user_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Import a recipe from a web page
///
/// # Endpoint
///
/// ```text
/// POST /v1/recipes/import
///
/// { "url": "https://cooking.example.com/soup", "save": false }
/// ```
///
/// Returns the sanitized draft (200), or with `save: true` the created
/// recipe (201).
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Bad URL, blocked site, or no recipe found
/// - `502 Bad Gateway`: The site could not be reached or returned an error
/// - `504 Gateway Timeout`: The site was too slow
pub async fn import_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let draft = state.importer.import(&req.url).await.map_err(|e| {
        tracing::info!(user_id = %auth.user_id, url = %req.url, error = %e, "Recipe import failed");
        e
    })?;

    if !req.save {
        return Ok(Json(draft).into_response());
    }

    let detail = Recipe::create(&state.db, auth.user_id, RecipeInput::from(draft)).await?;

    tracing::info!(
        recipe_id = %detail.recipe.id,
        user_id = %auth.user_id,
        "Imported recipe saved"
    );

    Ok((StatusCode::CREATED, Json(detail)).into_response())
}
