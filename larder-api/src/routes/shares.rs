/// Sharing between users
///
/// # Endpoints
///
/// - `POST /v1/shares` - Share a recipe, meal plan, or grocery list by email
/// - `GET /v1/shares/received` - What others have shared with the caller
/// - `GET /v1/shares/:resource_type/:id` - Grants on one resource (owner only)
/// - `DELETE /v1/shares/:share_id` - Revoke (owner) or leave (recipient)
///
/// Sharing the same resource with the same person again updates the
/// permission instead of adding a second grant.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use larder_shared::{
    auth::{
        authorization::{require_ownership, Action},
        middleware::AuthContext,
    },
    models::{
        content_share::{
            ContentShare, ContentShareWithRecipient, CreateContentShare, SharePermission,
            ShareableType,
        },
        grocery_list::GroceryList,
        meal_plan::MealPlan,
        recipe::Recipe,
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

fn default_permission() -> SharePermission {
    SharePermission::View
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShareRequest {
    pub resource_type: ShareableType,
    pub resource_id: Uuid,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default = "default_permission")]
    pub permission: SharePermission,
}

#[derive(Debug, Serialize)]
pub struct ReceivedSharesResponse {
    pub shares: Vec<ContentShare>,
}

#[derive(Debug, Serialize)]
pub struct ResourceSharesResponse {
    pub resource_type: ShareableType,
    pub resource_id: Uuid,
    pub shares: Vec<ContentShareWithRecipient>,
}

/// Owner of a live shareable resource
pub(crate) async fn resource_owner(
    pool: &PgPool,
    resource_type: ShareableType,
    id: Uuid,
) -> ApiResult<Uuid> {
    let owner = match resource_type {
        ShareableType::Recipe => Recipe::find_by_id(pool, id).await?.map(|r| r.user_id),
        ShareableType::MealPlan => MealPlan::find_by_id(pool, id).await?.map(|p| p.user_id),
        ShareableType::GroceryList => GroceryList::find_by_id(pool, id).await?.map(|l| l.user_id),
    };

    owner.ok_or_else(|| ApiError::NotFound(format!("{} not found", resource_type)))
}

/// Share a resource with another user
///
/// # Endpoint
///
/// ```text
/// POST /v1/shares
///
/// {
///   "resource_type": "meal_plan",
///   "resource_id": "uuid",
///   "email": "friend@example.com",
///   "permission": "edit"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller does not own the resource
/// - `404 Not Found`: Resource or recipient email unknown
/// - `422 Unprocessable Entity`: Sharing with yourself
pub async fn create_share(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<(StatusCode, Json<ContentShare>)> {
    req.validate()?;

    let owner_id = resource_owner(&state.db, req.resource_type, req.resource_id).await?;
    require_ownership(&auth, owner_id, Action::Share, req.resource_type)?;

    let recipient = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with that email".to_string()))?;

    if recipient.id == auth.user_id {
        return Err(ApiError::invalid_field("email", "You cannot share with yourself"));
    }

    let share = ContentShare::upsert(
        &state.db,
        CreateContentShare {
            owner_id,
            recipient_id: recipient.id,
            shareable_type: req.resource_type,
            shareable_id: req.resource_id,
            permission: req.permission,
        },
    )
    .await?;

    tracing::info!(
        share_id = %share.id,
        resource_type = %req.resource_type,
        resource_id = %req.resource_id,
        permission = share.permission.as_str(),
        "Resource shared"
    );

    Ok((StatusCode::CREATED, Json(share)))
}

pub async fn list_received(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ReceivedSharesResponse>> {
    let shares = ContentShare::list_received(&state.db, auth.user_id).await?;
    Ok(Json(ReceivedSharesResponse { shares }))
}

/// Grants on one resource, with recipient emails
///
/// `resource_type` accepts `recipe`, `meal_plan`, or the URL forms
/// `recipes`, `meal-plans`, `grocery-lists`.
pub async fn list_for_resource(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((resource_type, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ResourceSharesResponse>> {
    let resource_type: ShareableType = resource_type.parse().map_err(ApiError::BadRequest)?;

    let owner_id = resource_owner(&state.db, resource_type, id).await?;
    require_ownership(&auth, owner_id, Action::Share, resource_type)?;

    let shares = ContentShare::list_for_resource(&state.db, resource_type, id).await?;

    Ok(Json(ResourceSharesResponse {
        resource_type,
        resource_id: id,
        shares,
    }))
}

/// Revoke a grant
///
/// The owner revokes; the recipient may also remove a grant to leave the
/// resource.
pub async fn revoke_share(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(share_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let share = ContentShare::find_by_id(&state.db, share_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Share not found".to_string()))?;

    if share.owner_id != auth.user_id && share.recipient_id != auth.user_id {
        return Err(ApiError::NotFound("Share not found".to_string()));
    }

    if !ContentShare::delete_owned(&state.db, share.id, share.owner_id).await? {
        return Err(ApiError::NotFound("Share not found".to_string()));
    }

    tracing::info!(share_id = %share.id, user_id = %auth.user_id, "Share revoked");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_request_defaults_to_view() {
        let req: ShareRequest = serde_json::from_value(serde_json::json!({
            "resource_type": "grocery_list",
            "resource_id": Uuid::nil(),
            "email": "friend@example.com"
        }))
        .unwrap();

        assert_eq!(req.permission, SharePermission::View);
        assert_eq!(req.resource_type, ShareableType::GroceryList);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_share_request_rejects_bad_email() {
        let req = ShareRequest {
            resource_type: ShareableType::Recipe,
            resource_id: Uuid::nil(),
            email: "not-an-email".to_string(),
            permission: SharePermission::Edit,
        };
        assert!(req.validate().is_err());
    }
}
