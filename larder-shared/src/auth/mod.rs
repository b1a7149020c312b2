/// Authentication and authorization
///
/// Identity comes from the external auth service as a signed JWT; this module
/// validates it and decides what the caller may do with each record.
///
/// # Modules
///
/// - [`jwt`]: HS256 access token validation
/// - [`middleware`]: Axum middleware producing an [`middleware::AuthContext`]
/// - [`authorization`]: ownership + share policy
///
/// # Example
///
/// ```no_run
/// use larder_shared::auth::authorization::{allows, Access, Action};
/// use larder_shared::models::content_share::SharePermission;
///
/// assert!(allows(Access::Shared(SharePermission::Edit), Action::Edit));
/// assert!(!allows(Access::Shared(SharePermission::Edit), Action::Delete));
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
