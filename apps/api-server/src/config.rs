//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    pub db_path: Option<PathBuf>,
    /// Log format
    pub log_format: LogFormat,
    /// Insert demo orders at startup when the store is empty
    pub seed_demo_orders: bool,
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}'", raw),
            })?,
            Err(_) => 3001,
        };

        let cors_origin_str = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into());
        let cors_allow_origin = parse_cors_origin(&cors_origin_str)?;

        let storage_provider = StorageProvider::from_str(
            &env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "sqlite".into()),
        );

        let db_path = env::var("DB_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        let seed_demo_orders = parse_flag(&env::var("SEED_DEMO_ORDERS").unwrap_or_default());

        Ok(Self {
            port,
            cors_allow_origin,
            storage_provider,
            db_path,
            log_format,
            seed_demo_orders,
        })
    }

    /// Log warnings about configuration that is fine for dev but not production.
    pub fn warn_if_insecure(&self) {
        if self.cors_allow_origin == HeaderValue::from_static("*") {
            tracing::warn!(
                "CORS_ALLOW_ORIGIN=*: any origin may read order data. \
                 Set CORS_ALLOW_ORIGIN to the frontend origin in production."
            );
        }
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!("STORAGE_PROVIDER=memory: orders are lost on restart.");
        }
    }
}

fn parse_cors_origin(raw: &str) -> Result<HeaderValue, ConfigError> {
    if raw == "*" {
        return Ok(HeaderValue::from_static("*"));
    }
    HeaderValue::from_str(raw).map_err(|e| ConfigError {
        field: "CORS_ALLOW_ORIGIN",
        message: format!("Invalid header value '{}': {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_provider_parsing() {
        assert_eq!(StorageProvider::from_str("memory"), StorageProvider::Memory);
        assert_eq!(StorageProvider::from_str("sqlite"), StorageProvider::Sqlite);
        assert_eq!(StorageProvider::from_str("SQLITE"), StorageProvider::Sqlite);
        assert_eq!(StorageProvider::from_str("anything"), StorageProvider::Memory);
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("no"));
    }

    #[test]
    fn cors_origin_parsing() {
        assert_eq!(parse_cors_origin("*").unwrap(), HeaderValue::from_static("*"));
        assert_eq!(
            parse_cors_origin("https://admin.example.com").unwrap(),
            "https://admin.example.com"
        );
        let err = parse_cors_origin("bad\norigin").unwrap_err();
        assert_eq!(err.field, "CORS_ALLOW_ORIGIN");
    }
}
