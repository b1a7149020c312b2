/// Middleware modules for the API server
///
/// Authentication lives in `larder_shared::auth::middleware`; this module
/// holds HTTP-only concerns.

pub mod security;
