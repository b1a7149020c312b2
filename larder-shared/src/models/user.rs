/// Mirror of accounts owned by the external auth service
///
/// Larder never signs anyone up. Rows exist so records have an owner to
/// reference and shares can address a recipient by email; `email` is CITEXT,
/// so lookups ignore case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email::TEXT AS email, name, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row written when the auth service provisions an account
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
}

/// Surrounding whitespace never belongs to an address
pub fn normalize_email(email: &str) -> &str {
    email.trim()
}

impl User {
    /// Inserts a mirror row
    ///
    /// # Errors
    ///
    /// A unique violation when the email is taken, ignoring case.
    pub async fn insert(pool: &PgPool, new: NewUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(&new.email))
            .bind(new.name.as_deref().map(str::trim).filter(|n| !n.is_empty()))
            .fetch_one(pool)
            .await
    }

    /// Share recipients are addressed this way
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1::CITEXT");

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }
}
