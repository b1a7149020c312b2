/// Worker configuration
///
/// Read from environment variables (`.env` honoured):
///
/// | Variable | Default |
/// |----------|---------|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | 5 |
/// | `SWEEP_INTERVAL_SECS` | 300 |
/// | `SOFT_DELETE_RETENTION_DAYS` | 30 |

use anyhow::Context;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Sweeper settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps
    pub interval: Duration,

    /// How long soft-deleted rows are kept before purging
    pub retention_days: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub sweep: SweepConfig,
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

impl SweepConfig {
    /// Checks the interval and retention are usable
    ///
    /// # Errors
    ///
    /// A zero interval or a negative retention.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval.is_zero() {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than zero");
        }
        if self.retention_days < 0 {
            anyhow::bail!("SOFT_DELETE_RETENTION_DAYS must not be negative");
        }
        Ok(())
    }
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Missing `DATABASE_URL`, unparsable numbers, or an invalid sweep setting.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let sweep = SweepConfig {
            interval: Duration::from_secs(parse_var(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
            retention_days: parse_var("SOFT_DELETE_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
        };
        sweep.validate()?;

        Ok(Self {
            database_url,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5u32)?,
            sweep,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SweepConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.retention_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SweepConfig {
            interval: Duration::ZERO,
            ..SweepConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_retention_rejected() {
        let config = SweepConfig {
            retention_days: -1,
            ..SweepConfig::default()
        };
        assert!(config.validate().is_err());

        // Zero purges everything already deleted
        let config = SweepConfig {
            retention_days: 0,
            ..SweepConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
