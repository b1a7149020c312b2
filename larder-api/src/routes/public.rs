/// Public read-only grocery list links
///
/// ```text
/// GET /shared/grocery-lists/:token
/// ```
///
/// No authentication. The response carries the list name and grouped items
/// only; the owner's identity and the token itself are left out.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or revoked token, or the list was deleted
/// - `410 Gone`: The link has expired

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use larder_shared::{
    grocery::{group_by_category, CategoryGroup},
    models::grocery_list::{GroceryList, ShareLinkState, SHARE_TOKEN_LENGTH},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SharedGroceryList {
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub groups: Vec<CategoryGroup>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Shared list not found".to_string())
}

pub async fn get_shared_grocery_list(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SharedGroceryList>> {
    // Skip the query for tokens that could never have been issued
    if token.len() != SHARE_TOKEN_LENGTH || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(not_found());
    }

    let list = GroceryList::find_by_share_token(&state.db, &token)
        .await?
        .ok_or_else(not_found)?;

    match list.share_link_state(Utc::now()) {
        Some(ShareLinkState::Active) => {}
        Some(ShareLinkState::Expired) => {
            return Err(ApiError::Gone("This shared list link has expired".to_string()));
        }
        None => return Err(not_found()),
    }

    let items = GroceryList::items(&state.db, list.id).await?;

    Ok(Json(SharedGroceryList {
        name: list.name,
        updated_at: list.updated_at,
        expires_at: list.share_expires_at,
        groups: group_by_category(items),
    }))
}
