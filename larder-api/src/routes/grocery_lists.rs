/// Grocery list endpoints
///
/// # Endpoints
///
/// - `POST /v1/grocery-lists` - Create a list, optionally with items
/// - `GET /v1/grocery-lists` - Own and shared lists with item counts
/// - `GET /v1/grocery-lists/:id` - List with items grouped by category
/// - `PUT /v1/grocery-lists/:id` - Rename
/// - `DELETE /v1/grocery-lists/:id` - Soft-delete (owner only)
/// - `POST /v1/grocery-lists/:id/items` - Add an item
/// - `PUT|DELETE /v1/grocery-lists/:id/items/:item_id`
/// - `POST /v1/grocery-lists/:id/items/:item_id/toggle` - Flip purchased
/// - `POST /v1/grocery-lists/:id/clear-purchased`
/// - `POST|DELETE /v1/grocery-lists/:id/share-link` - Public read-only link (owner only)
///
/// Item writes feed the list owner's autocomplete templates.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{required_text, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use larder_shared::{
    auth::{
        authorization::{require_access, Access, Action},
        middleware::AuthContext,
    },
    grocery::{group_by_category, CategoryGroup},
    ingredient::quantity_in_range,
    models::{
        category::GroceryCategory,
        content_share::ShareableType,
        grocery_list::{
            GroceryItem, GroceryList, GroceryListSummary, ItemSource, NewGroceryItem,
        },
        item_template::{normalize_name, UserItemTemplate},
        unit::MeasurementUnit,
    },
    sanitize::clean_optional,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const MAX_NAME_CHARS: usize = 255;
const MAX_ITEM_NOTES_CHARS: usize = 255;

/// Grocery list with grouped items
#[derive(Debug, Serialize)]
pub struct GroceryListResponse {
    #[serde(flatten)]
    pub list: GroceryList,
    pub groups: Vec<CategoryGroup>,
    pub access: Access,
}

impl GroceryListResponse {
    /// Builds the response, hiding the public link from anyone but the owner
    pub fn new(mut list: GroceryList, items: Vec<GroceryItem>, access: Access) -> Self {
        if !access.is_owner() {
            list.share_token = None;
            list.share_expires_at = None;
        }

        Self {
            list,
            groups: group_by_category(items),
            access,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "At most 500 items"))]
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Item fields for add and update
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ItemRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub quantity: Option<f64>,

    /// Unit name or common alias
    pub unit: Option<String>,

    /// Falls back to the owner's remembered category, then keyword inference
    pub category: Option<GroceryCategory>,

    #[validate(length(max = 255, message = "Notes must be at most 255 characters"))]
    pub notes: Option<String>,

    /// Only honoured on update
    pub purchased: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ShareLinkRequest {
    /// Days until the link stops working; omit for a link that never expires
    #[validate(range(min = 1, max = 365, message = "expires_in_days must be between 1 and 365"))]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShareLinkResponse {
    pub token: String,
    pub path: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct GroceryListListResponse {
    pub grocery_lists: Vec<GroceryListSummary>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct ClearPurchasedResponse {
    pub removed: u64,
}

/// Item fields after validation, before the category is resolved
struct CleanItem {
    name: String,
    quantity: Option<f64>,
    unit: Option<MeasurementUnit>,
    category: Option<GroceryCategory>,
    notes: Option<String>,
}

fn clean_item(req: &ItemRequest, prefix: &str) -> ApiResult<CleanItem> {
    req.validate()?;

    let field = |name: &str| format!("{}{}", prefix, name);

    let quantity = match req.quantity {
        Some(q) if !quantity_in_range(q) => {
            return Err(ApiError::invalid_field(
                field("quantity"),
                "Quantity must be greater than 0 and at most 100000",
            ));
        }
        other => other,
    };

    let unit = match req.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        None => None,
        Some(raw) => Some(MeasurementUnit::from_alias(raw).ok_or_else(|| {
            ApiError::invalid_field(field("unit"), format!("Unknown unit: {}", raw))
        })?),
    };

    Ok(CleanItem {
        name: required_text(&field("name"), &req.name, MAX_NAME_CHARS)?,
        quantity,
        unit,
        category: req.category,
        notes: clean_optional(req.notes.as_deref(), MAX_ITEM_NOTES_CHARS),
    })
}

/// Fills in missing categories from the owner's templates, then inference
async fn resolve_items(
    state: &AppState,
    owner_id: Uuid,
    items: Vec<CleanItem>,
) -> ApiResult<Vec<NewGroceryItem>> {
    let missing: Vec<String> = items
        .iter()
        .filter(|i| i.category.is_none())
        .map(|i| normalize_name(&i.name))
        .collect();
    let remembered = UserItemTemplate::categories_for(&state.db, owner_id, &missing).await?;

    Ok(items
        .into_iter()
        .map(|item| {
            let category = item
                .category
                .or_else(|| remembered.get(&normalize_name(&item.name)).copied())
                .unwrap_or_else(|| GroceryCategory::infer(&item.name));

            NewGroceryItem {
                name: item.name,
                quantity: item.quantity,
                unit: item.unit,
                category,
                notes: item.notes,
                source: ItemSource::Manual,
            }
        })
        .collect())
}

async fn resolve_item(state: &AppState, owner_id: Uuid, item: CleanItem) -> ApiResult<NewGroceryItem> {
    resolve_items(state, owner_id, vec![item])
        .await?
        .pop()
        .ok_or_else(|| ApiError::InternalError("Item resolution produced nothing".to_string()))
}

async fn remember(state: &AppState, owner_id: Uuid, item: &NewGroceryItem) -> ApiResult<()> {
    UserItemTemplate::record_use(&state.db, owner_id, &item.name, item.unit, item.category).await?;
    Ok(())
}

async fn load_list(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
    action: Action,
) -> ApiResult<(GroceryList, Access)> {
    let list = GroceryList::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Grocery list not found".to_string()))?;

    let access = require_access(
        &state.db,
        auth,
        ShareableType::GroceryList,
        list.id,
        list.user_id,
        action,
    )
    .await?;

    Ok((list, access))
}

pub async fn create_grocery_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<GroceryListResponse>)> {
    req.validate()?;
    let name = required_text("name", &req.name, MAX_NAME_CHARS)?;

    let cleaned = req
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| clean_item(item, &format!("items[{}].", i)))
        .collect::<ApiResult<Vec<_>>>()?;
    let items = resolve_items(&state, auth.user_id, cleaned).await?;

    let (list, rows) =
        GroceryList::create_with_items(&state.db, auth.user_id, &name, None, &items).await?;

    for item in &items {
        remember(&state, auth.user_id, item).await?;
    }

    tracing::info!(grocery_list_id = %list.id, user_id = %auth.user_id, items = rows.len(), "Grocery list created");

    Ok((
        StatusCode::CREATED,
        Json(GroceryListResponse::new(list, rows, Access::Owner)),
    ))
}

pub async fn list_grocery_lists(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<GroceryListListResponse>> {
    let (limit, offset) = (page.limit(), page.offset());
    let grocery_lists = GroceryList::list_accessible(&state.db, auth.user_id, limit, offset).await?;

    Ok(Json(GroceryListListResponse {
        grocery_lists,
        limit,
        offset,
    }))
}

pub async fn get_grocery_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GroceryListResponse>> {
    let (list, access) = load_list(&state, &auth, id, Action::View).await?;
    let items = GroceryList::items(&state.db, list.id).await?;

    Ok(Json(GroceryListResponse::new(list, items, access)))
}

pub async fn rename_grocery_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<Json<GroceryListResponse>> {
    req.validate()?;
    let (_, access) = load_list(&state, &auth, id, Action::Edit).await?;
    let name = required_text("name", &req.name, MAX_NAME_CHARS)?;

    let list = GroceryList::rename(&state.db, id, &name)
        .await?
        .ok_or_else(|| ApiError::NotFound("Grocery list not found".to_string()))?;
    let items = GroceryList::items(&state.db, id).await?;

    Ok(Json(GroceryListResponse::new(list, items, access)))
}

pub async fn delete_grocery_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_list(&state, &auth, id, Action::Delete).await?;

    if !GroceryList::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Grocery list not found".to_string()));
    }

    tracing::info!(grocery_list_id = %id, user_id = %auth.user_id, "Grocery list deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<(StatusCode, Json<GroceryItem>)> {
    let (list, _) = load_list(&state, &auth, id, Action::Edit).await?;

    let cleaned = clean_item(&req, "")?;
    let item = resolve_item(&state, list.user_id, cleaned).await?;

    let row = GroceryList::add_item(&state.db, list.id, &item).await?;
    remember(&state, list.user_id, &item).await?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ItemRequest>,
) -> ApiResult<Json<GroceryItem>> {
    let (list, _) = load_list(&state, &auth, id, Action::Edit).await?;

    let cleaned = clean_item(&req, "")?;
    let item = resolve_item(&state, list.user_id, cleaned).await?;

    let row = GroceryList::update_item(&state.db, list.id, item_id, &item, req.purchased)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    remember(&state, list.user_id, &item).await?;

    Ok(Json(row))
}

pub async fn toggle_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<GroceryItem>> {
    let (list, _) = load_list(&state, &auth, id, Action::Edit).await?;

    let row = GroceryList::toggle_item(&state.db, list.id, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    Ok(Json(row))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let (list, _) = load_list(&state, &auth, id, Action::Edit).await?;

    if !GroceryList::delete_item(&state.db, list.id, item_id).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_purchased(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClearPurchasedResponse>> {
    let (list, _) = load_list(&state, &auth, id, Action::Edit).await?;
    let removed = GroceryList::clear_purchased(&state.db, list.id).await?;

    Ok(Json(ClearPurchasedResponse { removed }))
}

/// Create or rotate the public read-only link
///
/// # Endpoint
///
/// ```text
/// POST /v1/grocery-lists/:id/share-link
///
/// { "expires_in_days": 7 }
/// ```
///
/// Calling again replaces the token, so earlier links stop working.
pub async fn create_share_link(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<ShareLinkRequest>>,
) -> ApiResult<(StatusCode, Json<ShareLinkResponse>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    load_list(&state, &auth, id, Action::Share).await?;

    let list = GroceryList::create_share_link(&state.db, id, req.expires_in_days)
        .await?
        .ok_or_else(|| ApiError::NotFound("Grocery list not found".to_string()))?;

    let token = list
        .share_token
        .ok_or_else(|| ApiError::InternalError("Share token missing after update".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(ShareLinkResponse {
            path: format!("/shared/grocery-lists/{}", token),
            token,
            expires_at: list.share_expires_at,
        }),
    ))
}

pub async fn revoke_share_link(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load_list(&state, &auth, id, Action::Share).await?;

    GroceryList::revoke_share_link(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Grocery list not found".to_string()))?;

    tracing::info!(grocery_list_id = %id, "Share link revoked");

    Ok(StatusCode::NO_CONTENT)
}
