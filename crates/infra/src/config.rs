//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_LOCAL_DB: &str = "sqlite://voucherdesk.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Which persistence backend this process uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Local { url: String },
    Postgres { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub change_feed_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store = match get("VOUCHERDESK_STORE").as_deref().map(str::to_ascii_lowercase) {
            None => StoreBackend::InMemory,
            Some(kind) => match kind.as_str() {
                "memory" => StoreBackend::InMemory,
                "local" => StoreBackend::Local {
                    url: get("VOUCHERDESK_LOCAL_DB").unwrap_or_else(|| DEFAULT_LOCAL_DB.to_string()),
                },
                "postgres" => StoreBackend::Postgres {
                    url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                },
                other => {
                    return Err(ConfigError::Invalid {
                        var: "VOUCHERDESK_STORE",
                        message: format!("'{other}' (expected memory, local or postgres)"),
                    });
                }
            },
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind = get("VOUCHERDESK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse().map_err(|e| ConfigError::Invalid {
            var: "VOUCHERDESK_BIND",
            message: format!("'{bind}': {e}"),
        })?;

        let change_feed_capacity = match get("VOUCHERDESK_CHANGE_FEED_CAPACITY") {
            None => DEFAULT_CHANGE_FEED_CAPACITY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "VOUCHERDESK_CHANGE_FEED_CAPACITY",
                        message: format!("'{raw}' (expected a positive integer)"),
                    });
                }
            },
        };

        Ok(Self {
            store,
            jwt_secret,
            bind_addr,
            change_feed_capacity,
        })
    }
}
