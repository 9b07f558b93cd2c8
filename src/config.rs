//! Environment-driven configuration.

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::PricingRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    Postgres,
    Memory,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// What to do when the durable store cannot be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Serve from the in-memory store and report degraded health.
    Degrade,
    /// Return the error to the caller.
    Fail,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub mode: StorageMode,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub catalog_seed_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub nats_url: Option<String>,
    pub storage: StorageConfig,
    pub pricing: PricingRules,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL");
        let mode = match var("STORAGE_MODE").as_deref() {
            None if database_url.is_some() => StorageMode::Postgres,
            None | Some("memory") => StorageMode::Memory,
            Some("postgres") => StorageMode::Postgres,
            Some(other) => return Err(ConfigError::Invalid { name: "STORAGE_MODE", value: other.to_string() }),
        };
        if mode == StorageMode::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let failure_policy = match var("STORAGE_FAILURE_POLICY").as_deref() {
            None | Some("degrade") => FailurePolicy::Degrade,
            Some("fail") => FailurePolicy::Fail,
            Some(other) => return Err(ConfigError::Invalid { name: "STORAGE_FAILURE_POLICY", value: other.to_string() }),
        };

        let defaults = PricingRules::default();
        let pricing = PricingRules {
            tax_rate: parse_or(&var, "TAX_RATE", defaults.tax_rate)?,
            free_shipping_threshold: parse_or(&var, "FREE_SHIPPING_THRESHOLD", defaults.free_shipping_threshold)?,
            flat_shipping_fee: parse_or(&var, "FLAT_SHIPPING_FEE", defaults.flat_shipping_fee)?,
        };
        for (name, value) in [("TAX_RATE", pricing.tax_rate), ("FREE_SHIPPING_THRESHOLD", pricing.free_shipping_threshold), ("FLAT_SHIPPING_FEE", pricing.flat_shipping_fee)] {
            if value < Decimal::ZERO {
                return Err(ConfigError::Invalid { name, value: value.to_string() });
            }
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 8083)?,
            jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            nats_url: var("NATS_URL"),
            storage: StorageConfig {
                mode,
                database_url,
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(parse_or(&var, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
                failure_policy,
                catalog_seed_path: var("CATALOG_SEED_PATH").map(PathBuf::from),
            },
            pricing,
        })
    }
}

fn parse_or<T, V>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    V: Fn(&'static str) -> Option<String>,
{
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
