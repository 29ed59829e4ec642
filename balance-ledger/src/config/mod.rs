//! Configuration module for balance-ledger.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Postgres settings; `None` runs against the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub conservation: ConservationPolicy,
    /// JSON seed file of addresses provisioned at startup.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Whether a transfer may credit a different amount than it debits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConservationPolicy {
    /// `send_amount` and `receive_amount` are independent (caller applies
    /// fees or conversion).
    #[default]
    Asymmetric,
    /// `send_amount` must equal `receive_amount`.
    Strict,
}

impl ConservationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asymmetric => "asymmetric",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for ConservationPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asymmetric" => Ok(Self::Asymmetric),
            "strict" => Ok(Self::Strict),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "TRANSFER_CONSERVATION must be 'asymmetric' or 'strict', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ConservationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => Some(DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            }),
            _ => None,
        };

        let conservation = match env::var("TRANSFER_CONSERVATION") {
            Ok(value) => value.parse()?,
            Err(_) => ConservationPolicy::default(),
        };

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "balance-ledger".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database,
            conservation,
            seed_file: env::var("SEED_ADDRESSES_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }
}
