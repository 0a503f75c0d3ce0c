//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use domain::OrderConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `SEED_FILE` — optional JSON file with accounts and products to load
/// - `TREAT_MISSING_PRICE_AS_ERROR` — reject unpriced products (default: `false`)
/// - `MAX_COMMIT_ATTEMPTS` — tries per operation on conflicts (default: `3`)
/// - `DEFAULT_PAGE_SIZE` / `MAX_PAGE_SIZE` — list paging (default: `10` / `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub seed_file: Option<PathBuf>,
    pub order: OrderConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let order = OrderConfig {
            treat_missing_price_as_error: parse_var(&lookup, "TREAT_MISSING_PRICE_AS_ERROR")
                .unwrap_or(defaults.order.treat_missing_price_as_error),
            max_commit_attempts: parse_var(&lookup, "MAX_COMMIT_ATTEMPTS")
                .unwrap_or(defaults.order.max_commit_attempts),
            default_page_size: parse_var(&lookup, "DEFAULT_PAGE_SIZE")
                .unwrap_or(defaults.order.default_page_size),
            max_page_size: parse_var(&lookup, "MAX_PAGE_SIZE")
                .unwrap_or(defaults.order.max_page_size),
        };

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            seed_file: non_empty("SEED_FILE").map(PathBuf::from),
            order,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            seed_file: None,
            order: OrderConfig::default(),
        }
    }
}
