use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ticketing";
const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3001);
const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Credentials and endpoints of the hosted checkout provider.
///
/// Both secrets are optional so the service can boot without payments; the
/// checkout and webhook paths fail with an internal error until they are set.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub webhook_tolerance_secs: i64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub storage_backend: StorageBackend,
    pub bind_addr: SocketAddr,
    pub app_url: String,
    pub production: bool,
    pub cors: CorsConfig,
    pub payments: PaymentConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let token_secret =
            var("AUTH_TOKEN_SECRET").ok_or(ConfigError::Missing("AUTH_TOKEN_SECRET"))?;

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                var("DATABASE_MAX_CONNECTIONS"),
                5,
            )?,
            storage_backend: match var("STORAGE_BACKEND") {
                Some(value) => {
                    let parsed = value.parse::<StorageBackend>();
                    parsed.map_err(|_| ConfigError::Invalid {
                        name: "STORAGE_BACKEND",
                        value,
                    })?
                }
                None => StorageBackend::Postgres,
            },
            bind_addr: parse_or("BIND_ADDR", var("BIND_ADDR"), DEFAULT_BIND_ADDR)?,
            app_url: var("APP_URL")
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            production: var("RUST_ENV")
                .map(|value| value.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            cors: CorsConfig {
                allowed_origins: var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            },
            payments: PaymentConfig {
                secret_key: var("STRIPE_SECRET_KEY"),
                webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
                api_base: var("STRIPE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                webhook_tolerance_secs: parse_or(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS",
                    var("STRIPE_WEBHOOK_TOLERANCE_SECS"),
                    DEFAULT_WEBHOOK_TOLERANCE_SECS,
                )?,
                request_timeout_secs: parse_or(
                    "STRIPE_TIMEOUT_SECS",
                    var("STRIPE_TIMEOUT_SECS"),
                    DEFAULT_PROVIDER_TIMEOUT_SECS,
                )?,
            },
            auth: AuthConfig { token_secret },
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => {
            let parsed = value.trim().parse();
            parsed.map_err(|_| ConfigError::Invalid { name, value })
        }
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_required_values_are_set() {
        let config = config_from(&[("AUTH_TOKEN_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.bind_addr.port(), 3001);
        assert!(!config.production);
        assert!(config.payments.secret_key.is_none());
        assert!(config.payments.webhook_secret.is_none());
        assert_eq!(config.payments.webhook_tolerance_secs, 300);
        assert_eq!(config.cors.allowed_origins.len(), 2);
    }

    #[test]
    fn test_missing_token_secret_is_an_error() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("AUTH_TOKEN_SECRET"))
        ));
    }

    #[test]
    fn test_invalid_numbers_are_reported() {
        let err = config_from(&[
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                ..
            }
        ));
    }

    #[test]
    fn test_production_and_memory_backend() {
        let config = config_from(&[
            ("AUTH_TOKEN_SECRET", "s3cret"),
            ("RUST_ENV", "Production"),
            ("STORAGE_BACKEND", "memory"),
            ("APP_URL", "https://tickets.example.com/"),
        ])
        .unwrap();
        assert!(config.production);
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.app_url, "https://tickets.example.com");
    }
}
