//! Constants for the data hub
//!
//! Defaults for every runtime setting live here. `HubConfig::from_env()`
//! can override a subset of them at startup.

/// How often the scheduler runs a collection cycle (in seconds)
pub const COLLECTION_INTERVAL_SECS: u64 = 120;

/// Delay before the next attempt after a failed cycle (in seconds)
pub const ERROR_BACKOFF_SECS: u64 = 60;

/// Default time-to-live of cache entries (in seconds)
pub const CACHE_TTL_SECS: u64 = 300;

/// HTTP request timeout when fetching from a provider (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Length of the rate limiter's sliding window (in seconds)
pub const RATE_WINDOW_SECS: i64 = 60;

/// Requests per minute for sources with no explicit limit
pub const DEFAULT_RATE_LIMIT: usize = 10;

/// Per-source request ceilings (requests per minute)
pub const SOURCE_RATE_LIMITS: &[(&str, usize)] = &[
    (SOURCE_COINGECKO, 10),
    (SOURCE_STAKINGREWARDS, 10),
    (SOURCE_DEFILLAMA, 10),
    (SOURCE_COINMARKETCAP, 2),
];

/// Rate limiter key for CoinGecko
pub const SOURCE_COINGECKO: &str = "coingecko";

/// Rate limiter key for StakingRewards
pub const SOURCE_STAKINGREWARDS: &str = "stakingrewards";

/// Rate limiter key for DefiLlama
pub const SOURCE_DEFILLAMA: &str = "defillama";

/// Rate limiter key for CoinMarketCap
pub const SOURCE_COINMARKETCAP: &str = "coinmarketcap";

/// Number of coins requested for the market price dataset
pub const MARKET_PAGE_SIZE: usize = 200;

/// Number of top coins considered for staking enrichment
pub const STAKING_TOP_N: usize = 50;

/// Maximum number of DeFi protocols kept per cycle
pub const DEFI_PROTOCOL_CAP: usize = 50;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko endpoint for market listings
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// DefiLlama API base URL
pub const DEFILLAMA_API_URL: &str = "https://api.llama.fi";

/// DefiLlama endpoint for the protocol list
pub const DEFILLAMA_PROTOCOLS_ENDPOINT: &str = "/protocols";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "CryptoWealth-DataHub/1.0";

/// Dataset source label for market prices
pub const MARKET_DATASET_SOURCE: &str = "coingecko";

/// Dataset source label for staking data
pub const STAKING_DATASET_SOURCE: &str = "staking_data_collector";

/// Dataset source label for DeFi protocols
pub const DEFI_DATASET_SOURCE: &str = "defillama";

/// Default `limit` for market price queries
pub const MARKET_QUERY_LIMIT: usize = 100;

/// Default `limit` for top staking queries
pub const TOP_STAKING_LIMIT: usize = 20;

/// Default `limit` for DeFi queries
pub const DEFI_QUERY_LIMIT: usize = 50;
