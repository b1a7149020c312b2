/// Periodic maintenance sweeper
///
/// Each sweep:
/// 1. Clears public share links that expired more than `retention_days` ago;
///    links expired more recently keep their token so they still answer 410
/// 2. Hard-deletes grocery lists, meal plans, and recipes soft-deleted more
///    than `retention_days` ago (children go with them via cascades)
///
/// A failed sweep is logged and retried on the next tick; the loop only stops
/// when its [`CancellationToken`] is cancelled.
///
/// # Example
///
/// ```no_run
/// use larder_worker::{config::SweepConfig, sweeper::Sweeper};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) {
/// let sweeper = Sweeper::new(pool, SweepConfig::default());
/// let shutdown = sweeper.shutdown_token();
///
/// let handle = tokio::spawn(async move { sweeper.run().await });
/// shutdown.cancel();
/// let _ = handle.await;
/// # }
/// ```

use crate::config::SweepConfig;
use chrono::{DateTime, Duration, Utc};
use larder_shared::models::{grocery_list::GroceryList, meal_plan::MealPlan, recipe::Recipe};
use sqlx::PgPool;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Sweep error, naming the step that failed
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to clear expired share links: {0}")]
    ShareLinks(#[source] sqlx::Error),

    #[error("Failed to purge deleted {table}: {source}")]
    Purge {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Rows touched by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_links: u64,
    pub grocery_lists: u64,
    pub meal_plans: u64,
    pub recipes: u64,
}

impl SweepReport {
    pub fn purged(&self) -> u64 {
        self.grocery_lists + self.meal_plans + self.recipes
    }

    pub fn is_empty(&self) -> bool {
        self.expired_links == 0 && self.purged() == 0
    }
}

/// Rows soft-deleted, and share links expired, before this instant are swept
pub fn purge_cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

pub struct Sweeper {
    db: PgPool,
    config: SweepConfig,
    shutdown_token: CancellationToken,
}

impl Sweeper {
    pub fn new(db: PgPool, config: SweepConfig) -> Self {
        Self {
            db,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`Sweeper::run`] after the current sweep
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs a single sweep as of `now`
    ///
    /// # Errors
    ///
    /// The first database failure; earlier steps stay applied.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let cutoff = purge_cutoff(now, self.config.retention_days);

        let expired_links = GroceryList::clear_expired_share_links(&self.db, cutoff)
            .await
            .map_err(SweepError::ShareLinks)?;

        let grocery_lists = GroceryList::purge_deleted(&self.db, cutoff)
            .await
            .map_err(|source| SweepError::Purge {
                table: "grocery_lists",
                source,
            })?;

        let meal_plans = MealPlan::purge_deleted(&self.db, cutoff)
            .await
            .map_err(|source| SweepError::Purge {
                table: "meal_plans",
                source,
            })?;

        let recipes = Recipe::purge_deleted(&self.db, cutoff)
            .await
            .map_err(|source| SweepError::Purge {
                table: "recipes",
                source,
            })?;

        Ok(SweepReport {
            expired_links,
            grocery_lists,
            meal_plans,
            recipes,
        })
    }

    /// Sweeps on every interval tick until shutdown
    ///
    /// The first sweep runs immediately.
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            retention_days = self.config.retention_days,
            "Sweeper starting"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sweep_once(Utc::now()).await {
                        Ok(report) if report.is_empty() => {
                            tracing::debug!("Sweep found nothing to do");
                        }
                        Ok(report) => {
                            tracing::info!(
                                expired_links = report.expired_links,
                                grocery_lists = report.grocery_lists,
                                meal_plans = report.meal_plans,
                                recipes = report.recipes,
                                "Sweep complete"
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Sweep failed");
                        }
                    }
                }
            }
        }
    }
}
