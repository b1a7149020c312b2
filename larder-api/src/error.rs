/// `ApiError` and its JSON body
///
/// Every handler returns [`ApiResult`]. An error renders as
///
/// ```json
/// { "error": "not_found", "message": "Recipe not found" }
/// ```
///
/// and 422 validation failures add `"details": [{ "field", "message" }]`.
/// Internal errors are logged and replaced by a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use larder_shared::auth::authorization::AuthzError;
use larder_shared::auth::jwt::JwtError;
use larder_shared::auth::middleware::AuthError;
use larder_shared::grocery::GroceryError;
use larder_shared::import::ImportError;
use larder_shared::models::meal_plan::PlanDateError;
use larder_shared::sanitize::SanitizeError;
use serde::{Deserialize, Serialize};

pub type ApiResult<T> = Result<T, ApiError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but neither owner nor holder of a sufficient share
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A meal slot already taken, a share that already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Expired public share link
    #[error("Gone: {0}")]
    Gone(String),

    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// The page was fetched but held no usable recipe
    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Request path of the offending value, e.g. `ingredients[2].unit`
    pub field: String,
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::ValidationError(_) | ApiError::ImportFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Gone(_) => "gone",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::ImportFailed(_) => "import_failed",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::GatewayTimeout(_) => "gateway_timeout",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    fn into_body(self) -> ErrorResponse {
        let code = self.code().to_string();
        let (message, details) = match self {
            ApiError::ValidationError(details) => {
                ("Request validation failed".to_string(), Some(details))
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Gone(msg)
            | ApiError::ImportFailed(msg)
            | ApiError::BadGateway(msg)
            | ApiError::GatewayTimeout(msg) => (msg, None),
        };

        ErrorResponse {
            error: code,
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.into_body())).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        let db_err = match err {
            sqlx::Error::RowNotFound => return ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => db_err,
            other => return ApiError::InternalError(format!("Database error: {}", other)),
        };

        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => ApiError::Conflict(format!(
                "Constraint violation: {}",
                db_err.constraint().unwrap_or("unique")
            )),
            Some(FOREIGN_KEY_VIOLATION) => {
                ApiError::NotFound("Referenced resource not found".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", db_err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthorized { .. } => ApiError::Forbidden(err.to_string()),
            AuthzError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Upstream trouble is a gateway error; a page without a recipe is the caller's problem
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Timeout => ApiError::GatewayTimeout(err.to_string()),
            ImportError::Network(_) | ImportError::HttpStatus(_) => {
                ApiError::BadGateway(err.to_string())
            }
            _ => ApiError::ImportFailed(err.to_string()),
        }
    }
}

impl From<GroceryError> for ApiError {
    fn from(err: GroceryError) -> Self {
        match err {
            GroceryError::EmptyPlan => ApiError::invalid_field("meal_plan", err.to_string()),
            GroceryError::InvalidRange(err) => err.into(),
            GroceryError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<PlanDateError> for ApiError {
    fn from(err: PlanDateError) -> Self {
        let field = match err {
            PlanDateError::OutsidePlan { .. } => "date",
            _ => "end_date",
        };
        ApiError::invalid_field(field, err.to_string())
    }
}

impl From<SanitizeError> for ApiError {
    fn from(err: SanitizeError) -> Self {
        ApiError::invalid_field("url", err.to_string())
    }
}

/// Flattens `validator` derive failures into sorted `details`
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    ValidationErrorDetail::new(field.to_string(), message)
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}
