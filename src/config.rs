//! Runtime configuration
//!
//! Defaults come from [`crate::constants`]; [`HubConfig::from_env`] lets a
//! deployment override the interval, TTL, endpoints and DeFi collection.

use crate::{
    constants::{
        CACHE_TTL_SECS, COINGECKO_API_URL, COLLECTION_INTERVAL_SECS, DEFILLAMA_API_URL,
        DEFI_PROTOCOL_CAP, ERROR_BACKOFF_SECS, MARKET_PAGE_SIZE, REQUEST_TIMEOUT_SECS,
        SOURCE_RATE_LIMITS, STAKING_TOP_N,
    },
    error::ConfigError,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Settings for the collector, cache and scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Sleep between successful cycles
    pub collection_interval: Duration,
    /// Sleep after a failed cycle
    pub error_backoff: Duration,
    /// Default TTL for cache writes
    pub cache_ttl: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    pub coingecko_url: String,
    pub defillama_url: String,
    /// Coins fetched for the market dataset
    pub market_page_size: usize,
    /// Coins considered for staking enrichment
    pub staking_top_n: usize,
    /// Maximum DeFi protocols kept
    pub defi_cap: usize,
    /// Whether the DeFi pipeline runs at all
    pub enable_defi: bool,
    /// Requests per minute, per source
    pub rate_limits: HashMap<String, usize>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            collection_interval: Duration::from_secs(COLLECTION_INTERVAL_SECS),
            error_backoff: Duration::from_secs(ERROR_BACKOFF_SECS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            coingecko_url: COINGECKO_API_URL.to_string(),
            defillama_url: DEFILLAMA_API_URL.to_string(),
            market_page_size: MARKET_PAGE_SIZE,
            staking_top_n: STAKING_TOP_N,
            defi_cap: DEFI_PROTOCOL_CAP,
            enable_defi: true,
            rate_limits: SOURCE_RATE_LIMITS
                .iter()
                .map(|(source, limit)| (source.to_string(), *limit))
                .collect(),
        }
    }
}

impl HubConfig {
    /// Loads the defaults, overridden by `DATA_HUB_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`HubConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "DATA_HUB_COLLECTION_INTERVAL")? {
            config.collection_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DATA_HUB_ERROR_BACKOFF")? {
            config.error_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "DATA_HUB_CACHE_TTL")? {
            if secs == 0 {
                return Err(invalid("DATA_HUB_CACHE_TTL", "0"));
            }
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("DATA_HUB_COINGECKO_URL") {
            config.coingecko_url = url;
        }
        if let Some(url) = lookup("DATA_HUB_DEFILLAMA_URL") {
            config.defillama_url = url;
        }
        if let Some(raw) = lookup("DATA_HUB_ENABLE_DEFI") {
            config.enable_defi = match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(invalid("DATA_HUB_ENABLE_DEFI", &raw)),
            };
        }

        tracing::debug!(?config, "Loaded data hub configuration");
        Ok(config)
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        value: value.to_string(),
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(var, &raw)),
        None => Ok(None),
    }
}
