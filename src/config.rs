use dotenv::dotenv;
use std::env;
use thiserror::Error;
use tracing::info;

const ENGINE_INBOUND_CAPACITY: &str = "ENGINE_INBOUND_CAPACITY";
const ENGINE_OUTBOUND_CAPACITY: &str = "ENGINE_OUTBOUND_CAPACITY";
const DEFAULT_ASSET_SUPPLY: &str = "DEFAULT_ASSET_SUPPLY";

/// Errors raised while reading the configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not hold a usable value
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime settings of the matching engine worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Capacity of the inbound order channel. Producers wait when it is full.
    pub inbound_capacity: usize,
    /// Capacity of the outbound order channel. The engine waits when it is full.
    pub outbound_capacity: usize,
    /// Issued quantity given to assets created by the inbound translator.
    pub default_asset_supply: u64,
}

impl EngineConfig {
    pub fn from_env() -> Result<EngineConfig, ConfigError> {
        // Load .env file
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source, falling back to the
    /// defaults for missing variables.
    pub fn from_lookup<F>(lookup: F) -> Result<EngineConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let inbound_capacity = parse_capacity(ENGINE_INBOUND_CAPACITY, lookup(ENGINE_INBOUND_CAPACITY))?
            .unwrap_or(defaults.inbound_capacity);
        let outbound_capacity = parse_capacity(ENGINE_OUTBOUND_CAPACITY, lookup(ENGINE_OUTBOUND_CAPACITY))?
            .unwrap_or(defaults.outbound_capacity);
        let default_asset_supply = match lookup(DEFAULT_ASSET_SUPPLY) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: DEFAULT_ASSET_SUPPLY,
                value: raw.clone(),
            })?,
            None => defaults.default_asset_supply,
        };

        info!(
            inbound_capacity,
            outbound_capacity, default_asset_supply, "Loaded engine configuration"
        );

        Ok(EngineConfig {
            inbound_capacity,
            outbound_capacity,
            default_asset_supply,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            inbound_capacity: 1024,
            outbound_capacity: 1024,
            default_asset_supply: 1000,
        }
    }
}

/// Channel capacities must be positive; tokio panics on a zero-sized bounded channel.
fn parse_capacity(name: &'static str, raw: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(capacity) if capacity > 0 => Ok(Some(capacity)),
        _ => Err(ConfigError::InvalidValue { name, value: raw }),
    }
}
