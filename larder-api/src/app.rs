/// Router and shared state
///
/// ```text
/// /health                          public
/// /shared/grocery-lists/:token     public, read-only
/// /v1/recipes                      CRUD, POST /import
/// /v1/meal-plans                   CRUD, /:id/assignments, /:id/grocery-list
/// /v1/grocery-lists                CRUD, /:id/items, /:id/clear-purchased, /:id/share-link
/// /v1/shares                       grants between users
/// /v1/item-templates               autocomplete
/// /v1/dashboard
/// ```
///
/// Everything under `/v1` needs a bearer JWT. Outermost layer first: security
/// headers, compression, CORS, request tracing, then authentication on `/v1`.

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use larder_shared::auth::middleware::authenticate;
use larder_shared::import::{HttpFetcher, RecipeImporter};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub importer: RecipeImporter,
}

impl AppState {
    /// State backed by the real HTTP fetcher
    ///
    /// # Errors
    ///
    /// The HTTP client could not be built from the import settings.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let import_config = config.import.to_import_config();
        let fetcher = HttpFetcher::new(&import_config)?;
        let importer = RecipeImporter::new(Arc::new(fetcher), import_config);
        Ok(Self::with_importer(db, config, importer))
    }

    /// State with a caller-supplied importer, e.g. one serving canned pages
    pub fn with_importer(db: PgPool, config: Config, importer: RecipeImporter) -> Self {
        Self {
            db,
            config: Arc::new(config),
            importer,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

fn recipe_routes() -> Router<AppState> {
    use routes::recipes::*;

    Router::new()
        .route("/", post(create_recipe).get(list_recipes))
        .route("/import", post(import_recipe))
        .route(
            "/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
}

fn meal_plan_routes() -> Router<AppState> {
    use routes::meal_plans::*;

    Router::new()
        .route("/", post(create_meal_plan).get(list_meal_plans))
        .route(
            "/:id",
            get(get_meal_plan).put(update_meal_plan).delete(delete_meal_plan),
        )
        .route("/:id/assignments", post(add_assignment))
        .route("/:id/assignments/:assignment_id", delete(remove_assignment))
        .route("/:id/grocery-list", post(generate_grocery_list))
}

fn grocery_list_routes() -> Router<AppState> {
    use routes::grocery_lists::*;

    Router::new()
        .route("/", post(create_grocery_list).get(list_grocery_lists))
        .route(
            "/:id",
            get(get_grocery_list)
                .put(rename_grocery_list)
                .delete(delete_grocery_list),
        )
        .route("/:id/items", post(add_item))
        .route("/:id/items/:item_id", put(update_item).delete(delete_item))
        .route("/:id/items/:item_id/toggle", post(toggle_item))
        .route("/:id/clear-purchased", post(clear_purchased))
        .route(
            "/:id/share-link",
            post(create_share_link).delete(revoke_share_link),
        )
}

fn share_routes() -> Router<AppState> {
    use routes::shares::*;

    Router::new()
        .route("/", post(create_share))
        .route("/received", get(list_received))
        .route("/:share_id", delete(revoke_share))
        .route("/:resource_type/:id", get(list_for_resource))
}

/// `*` allows any origin without credentials; a list allows credentials
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .nest("/recipes", recipe_routes())
        .nest("/meal-plans", meal_plan_routes())
        .nest("/grocery-lists", grocery_list_routes())
        .nest("/shares", share_routes())
        .route("/item-templates", get(routes::item_templates::autocomplete))
        .route(
            "/item-templates/:id",
            delete(routes::item_templates::delete_template),
        )
        .route("/dashboard", get(routes::dashboard::get_dashboard))
        .layer(from_fn_with_state(state.clone(), require_user));

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/shared/grocery-lists/:token",
            get(routes::public::get_shared_grocery_list),
        )
        .nest("/v1", v1)
        .layer(trace)
        .layer(cors_layer(&state.config))
        .layer(CompressionLayer::new())
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Puts the caller's `AuthContext` into request extensions, or answers 401
async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
