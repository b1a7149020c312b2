/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `public`: Read-only grocery list share links
/// - `recipes`: Recipe CRUD and import
/// - `meal_plans`: Meal plans, assignments, grocery list generation
/// - `grocery_lists`: Lists, items, share links
/// - `shares`: Grants between users
/// - `item_templates`: Autocomplete memory
/// - `dashboard`: Per-user overview

pub mod dashboard;
pub mod grocery_lists;
pub mod health;
pub mod item_templates;
pub mod meal_plans;
pub mod public;
pub mod recipes;
pub mod shares;

use crate::error::{ApiError, ApiResult};
use larder_shared::sanitize::{clean_text, validate_url};
use serde::Deserialize;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Strips markup from a required text field
///
/// Input that is only markup or whitespace counts as missing.
pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> ApiResult<String> {
    let cleaned = clean_text(value, max_chars);
    if cleaned.is_empty() {
        return Err(ApiError::invalid_field(field, format!("{} is required", field)));
    }
    Ok(cleaned)
}

/// Validates an optional http(s) URL field
pub(crate) fn optional_url(field: &str, value: Option<&str>) -> ApiResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => validate_url(raw)
            .map(Some)
            .map_err(|e| ApiError::invalid_field(field, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let page = Pagination::default();
        assert_eq!(page.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(page.limit(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_required_text_rejects_markup_only() {
        assert_eq!(required_text("title", " <b>Soup</b> ", 255).unwrap(), "Soup");
        assert!(matches!(
            required_text("title", "<script>x</script>", 255),
            Err(ApiError::ValidationError(ref d)) if d[0].field == "title"
        ));
    }

    #[test]
    fn test_optional_url() {
        assert_eq!(optional_url("source_url", None).unwrap(), None);
        assert_eq!(optional_url("source_url", Some("  ")).unwrap(), None);
        assert_eq!(
            optional_url("source_url", Some("https://example.com/soup")).unwrap(),
            Some("https://example.com/soup".to_string())
        );
        assert!(optional_url("image_url", Some("javascript:alert(1)")).is_err());
    }
}
