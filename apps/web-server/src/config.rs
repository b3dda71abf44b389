//! Application configuration loaded from environment variables.

use std::env;

use quill_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    /// Mark the session cookie `Secure` (serve over HTTPS).
    pub cookie_secure: bool,
    /// Apply pending migrations on startup.
    pub auto_migrate: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            config.max_connections = parse_var("DB_MAX_CONNECTIONS").unwrap_or(100);
            config.min_connections = parse_var("DB_MIN_CONNECTIONS").unwrap_or(10);
            config.sql_logging = flag("DB_SQL_LOGGING").unwrap_or(true);
            config
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            cookie_secure: flag("COOKIE_SECURE").unwrap_or(false),
            auto_migrate: flag("AUTO_MIGRATE").unwrap_or(false),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

/// `true`/`1`/`yes` and `false`/`0`/`no`, case-insensitive.
fn flag(key: &str) -> Option<bool> {
    match env::var(key).ok()?.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
