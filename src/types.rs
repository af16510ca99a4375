//! Types for the data hub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cache keys the collector writes and the query side reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    /// Market price dataset
    MarketPrices,
    /// Staking dataset
    StakingData,
    /// DeFi protocol dataset
    DefiData,
    /// Cycle summary
    MarketSummary,
}

impl CacheKey {
    /// Get the string key used in the cache
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::MarketPrices => "market_prices",
            CacheKey::StakingData => "staking_data",
            CacheKey::DefiData => "defi_data",
            CacheKey::MarketSummary => "market_summary",
        }
    }

    /// Keys that hold datasets (everything but the summary)
    pub fn datasets() -> &'static [CacheKey] {
        &[
            CacheKey::MarketPrices,
            CacheKey::StakingData,
            CacheKey::DefiData,
        ]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market price and ranking of a single coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Provider identifier (e.g. "ethereum")
    pub id: Option<String>,
    /// Uppercase ticker
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: u32,
    pub total_volume: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    pub last_updated: DateTime<Utc>,
}

/// Staking opportunity for a coin, enriched with APY data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingRecord {
    /// Uppercase ticker
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: u32,
    pub staking_apy: f64,
    pub staking_apy_source: String,
    pub staking_apy_confidence: Confidence,
    pub staking_available: bool,
    pub staking_type: String,
    pub min_stake: f64,
    pub unbonding_period_days: u32,
    pub last_updated: DateTime<Utc>,
}

/// Total value locked in a DeFi protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefiRecord {
    /// Uppercase governance token ticker, empty when the protocol has none
    pub symbol: String,
    pub name: String,
    pub tvl: f64,
    pub tvl_change_24h: f64,
    pub category: String,
    pub chains: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// A normalized, provider-agnostic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum CanonicalRecord {
    MarketPrice(MarketRecord),
    Staking(StakingRecord),
    Defi(DefiRecord),
}

impl CanonicalRecord {
    /// Uppercase ticker of the record
    pub fn symbol(&self) -> &str {
        match self {
            CanonicalRecord::MarketPrice(r) => &r.symbol,
            CanonicalRecord::Staking(r) => &r.symbol,
            CanonicalRecord::Defi(r) => &r.symbol,
        }
    }

    /// Display name of the record
    pub fn name(&self) -> &str {
        match self {
            CanonicalRecord::MarketPrice(r) => &r.name,
            CanonicalRecord::Staking(r) => &r.name,
            CanonicalRecord::Defi(r) => &r.name,
        }
    }

    /// Protocol category, only set for DeFi records
    pub fn category(&self) -> Option<&str> {
        match self {
            CanonicalRecord::Defi(r) => Some(&r.category),
            _ => None,
        }
    }

    /// Staking APY, only set for staking records
    pub fn staking_apy(&self) -> Option<f64> {
        match self {
            CanonicalRecord::Staking(r) => Some(r.staking_apy),
            _ => None,
        }
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        match self {
            CanonicalRecord::MarketPrice(r) => r.last_updated,
            CanonicalRecord::Staking(r) => r.last_updated,
            CanonicalRecord::Defi(r) => r.last_updated,
        }
    }
}

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Label of the provider or collector that produced the data
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<CanonicalRecord>,
}

impl Dataset {
    /// Create a new dataset
    pub fn new(
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
        data: Vec<CanonicalRecord>,
    ) -> Self {
        Self {
            source: source.into(),
            timestamp,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// How much of a cycle succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Every enabled pipeline refreshed its dataset
    Success,
    /// At least one pipeline refreshed, at least one did not
    Partial,
    /// No pipeline refreshed
    Failed,
}

/// Counts derived from the datasets of one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub timestamp: DateTime<Utc>,
    pub total_coins: usize,
    pub total_staking: usize,
    /// Absent when DeFi collection is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_defi: Option<usize>,
    pub status: CycleStatus,
}

/// Confidence in an APY figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Staking reference data for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingEnrichment {
    pub apy: f64,
    pub source_label: String,
    pub confidence: Confidence,
    pub stake_type: String,
    pub min_stake: f64,
    pub unbonding_period_days: u32,
    pub available: bool,
}

impl StakingEnrichment {
    /// Entry used for symbols with no known staking data
    pub fn fallback() -> Self {
        Self {
            apy: 0.0,
            source_label: "fallback".to_string(),
            confidence: Confidence::Low,
            stake_type: "Unknown".to_string(),
            min_stake: 0.0,
            unbonding_period_days: 0,
            available: false,
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Every dataset is cached and fresh
    Healthy,
    /// Some datasets are missing or expired
    Degraded,
    /// Nothing is cached
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
