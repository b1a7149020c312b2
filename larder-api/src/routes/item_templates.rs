/// Grocery item autocomplete
///
/// - `GET /v1/item-templates?q=mi&limit=10` - Suggestions by name prefix
/// - `DELETE /v1/item-templates/:id` - Forget a suggestion

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use larder_shared::{
    auth::middleware::AuthContext,
    models::item_template::{clamp_limit, UserItemTemplate},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,

    /// 1..=25, default 10
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<UserItemTemplate>,
}

/// Most used first, then most recently used
pub async fn autocomplete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AutocompleteQuery>,
) -> ApiResult<Json<AutocompleteResponse>> {
    let suggestions =
        UserItemTemplate::autocomplete(&state.db, auth.user_id, &query.q, clamp_limit(query.limit))
            .await?;

    Ok(Json(AutocompleteResponse { suggestions }))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !UserItemTemplate::delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Item template not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
