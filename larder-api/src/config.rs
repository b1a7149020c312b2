/// API server settings, read from the environment (and `.env` in development)
///
/// - `API_HOST`: bind host (default: 0.0.0.0)
/// - `API_PORT`: bind port (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Shared secret for access tokens (required, >= 32 chars)
/// - `IMPORT_TIMEOUT_SECS`: Recipe page fetch timeout (default: 10)
/// - `IMPORT_MAX_BYTES`: Largest recipe page read (default: 2 MiB)
/// - `IMPORT_USER_AGENT`: User agent for recipe fetches
/// - `IMPORT_BLOCKED_HOSTS`: Comma-separated hosts refused by import
/// - `IMPORT_ALLOW_PRIVATE_HOSTS`: Allow localhost/private targets (default: false)
/// - `RUST_LOG`, `LOG_FORMAT`: Logging filter and `json` output
///
/// # Example
///
/// ```no_run
/// use larder_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use larder_shared::import::ImportConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub import: ImportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode adds HSTS
    pub production: bool,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret shared with the auth service
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Env-facing form of [`ImportConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    pub timeout_secs: u64,
    pub max_bytes: usize,
    pub user_agent: String,
    pub blocked_hosts: Vec<String>,
    pub allow_private_hosts: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        let defaults = ImportConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            max_bytes: defaults.max_bytes,
            user_agent: defaults.user_agent,
            blocked_hosts: defaults.blocked_hosts,
            allow_private_hosts: defaults.allow_private_hosts,
        }
    }
}

impl ImportSettings {
    pub fn to_import_config(&self) -> ImportConfig {
        ImportConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_bytes: self.max_bytes,
            user_agent: self.user_agent.clone(),
            blocked_hosts: self.blocked_hosts.clone(),
            allow_private_hosts: self.allow_private_hosts,
        }
    }
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

/// Splits a comma-separated list, dropping empty entries
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// # Errors
    ///
    /// A missing `DATABASE_URL` or `JWT_SECRET`, a secret under 32 bytes, or
    /// a variable that does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api = ApiConfig {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("API_PORT", 8080u16)?,
            production: parse_var("API_PRODUCTION", false)?,
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
        };

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        anyhow::ensure!(
            jwt_secret.len() >= 32,
            "JWT_SECRET is {} bytes; at least 32 are required",
            jwt_secret.len()
        );

        let defaults = ImportSettings::default();
        let import = ImportSettings {
            timeout_secs: parse_var("IMPORT_TIMEOUT_SECS", defaults.timeout_secs)?,
            max_bytes: parse_var("IMPORT_MAX_BYTES", defaults.max_bytes)?,
            user_agent: env::var("IMPORT_USER_AGENT").unwrap_or(defaults.user_agent),
            blocked_hosts: env::var("IMPORT_BLOCKED_HOSTS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
            allow_private_hosts: parse_var("IMPORT_ALLOW_PRIVATE_HOSTS", false)?,
        };

        if import.timeout_secs == 0 {
            anyhow::bail!("IMPORT_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            api,
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            import,
        })
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.is_empty() || self.api.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            import: ImportSettings::default(),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" https://a.example.com, ,https://b.example.com "),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_allows_any_origin() {
        let mut config = config();
        assert!(config.allows_any_origin());

        config.api.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_import_settings_round_trip_into_import_config() {
        let settings = ImportSettings {
            timeout_secs: 3,
            blocked_hosts: vec!["spam.example".to_string()],
            ..Default::default()
        };

        let import = settings.to_import_config();
        assert_eq!(import.timeout, Duration::from_secs(3));
        assert_eq!(import.blocked_hosts, vec!["spam.example"]);
        assert!(!import.allow_private_hosts);
    }

    #[test]
    fn test_secret_not_serialized() {
        let json = serde_json::to_value(config()).unwrap();
        assert!(json["jwt"].get("secret").is_none());
    }
}
