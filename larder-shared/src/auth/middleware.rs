/// Bearer-token authentication
///
/// The API's `/v1` middleware calls [`authenticate`] and stores the resulting
/// [`AuthContext`] in request extensions; handlers take it as
/// `Extension<AuthContext>`.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// Identity of the authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// `MissingCredentials` and `InvalidToken` are 401s; `InvalidFormat` is a 400
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        let message = match err {
            JwtError::Expired => "Token expired".to_string(),
            JwtError::InvalidIssuer { .. } => "Invalid issuer".to_string(),
            other => other.to_string(),
        };
        AuthError::InvalidToken(message)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not ASCII".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the request's bearer token against `secret`
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(bearer_token(headers)?, secret)?;
    Ok(AuthContext::new(claims.sub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_token_yields_subject() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();

        let context = authenticate(&headers_with(&format!("Bearer {}", token)), SECRET).unwrap();
        assert_eq!(context, AuthContext::new(user_id));
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        assert_eq!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        );
        assert!(matches!(
            authenticate(&headers_with("Basic abc"), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&headers_with("Bearer    "), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate(&headers_with("Bearer not-a-jwt"), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_message() {
        let claims = Claims::with_expiration(Uuid::new_v4(), Duration::minutes(-5));
        let token = create_token(&claims, SECRET).unwrap();

        assert_eq!(
            authenticate(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::InvalidToken("Token expired".to_string()))
        );
    }
}
