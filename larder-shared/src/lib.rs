//! # Larder Shared Library
//!
//! Types, SQL, and business rules used by both the Larder API server and the
//! maintenance worker.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and embedded migrations
//! - `models`: database rows and their queries
//! - `auth`: JWT validation, request identity, ownership/share policy
//! - `sanitize`: HTML stripping and URL validation for untrusted input
//! - `ingredient`: free-text ingredient line parser
//! - `import`: schema.org recipe import from web pages
//! - `grocery`: grocery list aggregation from meal plans

pub mod auth;
pub mod db;
pub mod grocery;
pub mod import;
pub mod ingredient;
pub mod models;
pub mod sanitize;

/// Current version of the Larder shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
