/// Schema migrations from the workspace `migrations/` directory
///
/// Each change is an `up`/`down` pair embedded at compile time, so the API
/// and the worker can both bring a fresh database up to date on start.

use sqlx::{
    migrate::{MigrateError, Migrator},
    PgPool,
};
use tracing::{error, info};

pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Newest embedded migration version
pub fn latest_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Applies every migration the database has not recorded yet
///
/// # Errors
///
/// A failing script, or an applied migration whose checksum changed.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    if let Err(e) = MIGRATOR.run(pool).await {
        error!(error = %e, "Schema migration failed");
        return Err(e);
    }

    info!(version = ?latest_version(), "Schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_up_has_a_down() {
        let (downs, ups): (Vec<_>, Vec<_>) = MIGRATOR
            .iter()
            .partition(|m| m.migration_type.is_down_migration());

        // users, enums, recipes, meal plans, grocery lists, templates, shares
        assert_eq!(ups.len(), 7);
        assert_eq!(downs.len(), ups.len());
    }

    #[test]
    fn test_latest_version_is_newest() {
        let latest = latest_version().unwrap();
        assert!(MIGRATOR.iter().all(|m| m.version <= latest));
        assert!(latest >= 20250101000007);
    }
}
