//! Data hub query facade
//!
//! Owns the collector and its cache, and answers read queries from whatever
//! the last cycles left in the cache.

use crate::{
    clock::{Clock, SystemClock},
    collector::{Collector, CycleReport},
    config::HubConfig,
    constants::{DEFI_QUERY_LIMIT, MARKET_QUERY_LIMIT, TOP_STAKING_LIMIT},
    enrichment::StaticApyTable,
    error::{FetchError, QueryError},
    metrics::{MetricsCollector, SourceMetrics},
    providers::HttpFetcher,
    query::{CoinView, DataQuery, DatasetResponse},
    rate_limiter::RateLimiter,
    scheduler::{Scheduler, SchedulerHandle},
    store::{CacheValue, DataCache},
    types::{CacheKey, CanonicalRecord, ComponentHealth, Dataset, HealthStatus, Summary},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Collection and query entry point
///
/// # Example
/// ```no_run
/// use crypto_data_hub::{DataHub, DataQuery, HubConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hub = DataHub::new(HubConfig::from_env()?)?;
/// let scheduler = hub.start_scheduler();
///
/// let prices = hub.market_prices(DataQuery::new().symbols("btc,eth")).await?;
/// for coin in &prices.data {
///     println!("{}: {}", coin.symbol(), coin.name());
/// }
///
/// scheduler.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct DataHub {
    collector: Arc<Collector>,
    cache: Arc<DataCache>,
    metrics: Arc<MetricsCollector>,
    clock: Arc<dyn Clock>,
}

impl DataHub {
    /// Creates a hub that fetches over HTTP with the wall clock
    pub fn new(config: HubConfig) -> Result<Self, FetchError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let limiter = Arc::new(RateLimiter::with_limits(
            config.rate_limits.clone(),
            clock.clone(),
        ));
        let metrics = Arc::new(MetricsCollector::new());
        let fetcher = Arc::new(HttpFetcher::with_timeout(
            limiter,
            metrics.clone(),
            config.request_timeout,
        )?);
        let cache = Arc::new(DataCache::with_default_ttl(config.cache_ttl, clock.clone()));
        let collector = Arc::new(Collector::new(
            fetcher,
            cache,
            Arc::new(StaticApyTable::new()),
            clock.clone(),
            config,
        ));

        Ok(Self::with_components(collector, metrics, clock))
    }

    /// Creates a hub around an existing collector
    ///
    /// This is primarily for testing with a mock fetcher and manual clock.
    pub fn with_components(
        collector: Arc<Collector>,
        metrics: Arc<MetricsCollector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = collector.cache().clone();
        Self {
            collector,
            cache,
            metrics,
            clock,
        }
    }

    /// Gets the live cache entry for `key`
    ///
    /// # Returns
    /// `NotAvailable` if nothing is cached or the entry expired
    pub async fn get_data(&self, key: CacheKey) -> Result<Arc<CacheValue>, QueryError> {
        self.cache.get(key.as_str()).await.ok_or_else(|| {
            tracing::debug!(key = %key, "Cache miss");
            QueryError::not_available(key.as_str())
        })
    }

    /// Like [`DataHub::get_data`], but runs a cycle first on a miss
    ///
    /// A miss during a scheduled cycle waits for that cycle instead of
    /// starting another one when it already filled `key`.
    pub async fn get_data_or_refresh(
        &self,
        key: CacheKey,
    ) -> Result<Arc<CacheValue>, QueryError> {
        if let Ok(value) = self.get_data(key).await {
            return Ok(value);
        }
        tracing::info!(key = %key, "No cached data, running collection cycle on demand");
        self.collector.run_cycle_if_missing(key).await;
        self.get_data(key).await
    }

    async fn dataset(&self, key: CacheKey) -> Result<Dataset, QueryError> {
        self.cache
            .get_dataset(key.as_str())
            .await
            .ok_or_else(|| QueryError::not_available(key.as_str()))
    }

    async fn query(
        &self,
        key: CacheKey,
        query: &DataQuery,
        default_limit: Option<usize>,
    ) -> Result<DatasetResponse, QueryError> {
        let dataset = self.dataset(key).await?;
        let data = query.apply(&dataset.data, default_limit)?;
        Ok(DatasetResponse::from_dataset(&dataset, data))
    }

    /// Market prices, 100 records unless the query sets a limit
    pub async fn market_prices(&self, query: DataQuery) -> Result<DatasetResponse, QueryError> {
        self.query(CacheKey::MarketPrices, &query, Some(MARKET_QUERY_LIMIT))
            .await
    }

    /// Staking opportunities, unlimited unless the query sets a limit
    pub async fn staking_data(&self, query: DataQuery) -> Result<DatasetResponse, QueryError> {
        self.query(CacheKey::StakingData, &query, None).await
    }

    /// Highest-APY staking opportunities, 20 by default
    pub async fn top_staking(&self, limit: Option<usize>) -> Result<DatasetResponse, QueryError> {
        let dataset = self.dataset(CacheKey::StakingData).await?;
        let mut data = dataset.data.clone();
        data.sort_by(|a, b| {
            let apy = |r: &CanonicalRecord| r.staking_apy().unwrap_or(0.0);
            apy(b).total_cmp(&apy(a))
        });
        data.truncate(limit.unwrap_or(TOP_STAKING_LIMIT));
        Ok(DatasetResponse::from_dataset(&dataset, data))
    }

    /// DeFi protocols, 50 records unless the query sets a limit
    pub async fn defi_data(&self, query: DataQuery) -> Result<DatasetResponse, QueryError> {
        self.query(CacheKey::DefiData, &query, Some(DEFI_QUERY_LIMIT))
            .await
    }

    /// Summary of the last collection cycle
    pub async fn market_summary(&self) -> Result<Summary, QueryError> {
        let key = CacheKey::MarketSummary.as_str();
        self.cache
            .get_summary(key)
            .await
            .ok_or_else(|| QueryError::not_available(key))
    }

    /// Coins whose name or symbol contains `q`, case-insensitive
    ///
    /// # Errors
    /// `InvalidQuery` for a blank `q`, checked before the cache is read
    pub async fn search(&self, q: &str) -> Result<DatasetResponse, QueryError> {
        let q = q.trim();
        if q.is_empty() {
            return Err(QueryError::invalid("Query parameter is required"));
        }

        let mut response = self
            .query(CacheKey::MarketPrices, &DataQuery::new().search(q), None)
            .await?;
        response.query = Some(q.to_string());
        Ok(response)
    }

    /// Market record for `symbol` joined with its staking record
    pub async fn coin(&self, symbol: &str) -> Result<CoinView, QueryError> {
        let symbol = symbol.trim().to_uppercase();

        let market = self.dataset(CacheKey::MarketPrices).await?;
        let market_data = market
            .data
            .iter()
            .find_map(|r| match r {
                CanonicalRecord::MarketPrice(m) if m.symbol == symbol => Some(m.clone()),
                _ => None,
            })
            .ok_or_else(|| QueryError::not_available(&symbol))?;

        // Staking data is optional for a coin view
        let staking_data = self
            .cache
            .get_dataset(CacheKey::StakingData.as_str())
            .await
            .and_then(|staking| {
                staking.data.into_iter().find_map(|r| match r {
                    CanonicalRecord::Staking(s) if s.symbol == symbol => Some(s),
                    _ => None,
                })
            });

        Ok(CoinView {
            symbol,
            market_data,
            staking_data,
            timestamp: self.clock.now(),
        })
    }

    /// Forces an immediate collection cycle
    ///
    /// Waits for a scheduled cycle in progress to finish first.
    pub async fn refresh_now(&self) -> CycleReport {
        self.collector.run_cycle().await
    }

    /// Spawns the periodic scheduler with the configured intervals
    pub fn start_scheduler(&self) -> SchedulerHandle {
        Scheduler::new(self.collector.clone(), self.collector.config()).start()
    }

    /// Fetch metrics for every source contacted so far
    pub async fn source_metrics(&self) -> Vec<SourceMetrics> {
        self.metrics.all_metrics().await
    }

    /// Dataset keys this hub is expected to keep fresh
    fn expected_keys(&self) -> Vec<CacheKey> {
        CacheKey::datasets()
            .iter()
            .copied()
            .filter(|key| *key != CacheKey::DefiData || self.collector.config().enable_defi)
            .collect()
    }

    /// Perform a health check on the data hub
    ///
    /// # Returns
    /// ComponentHealth with the freshness of each dataset and per-source
    /// fetch metrics
    pub async fn health_check(&self) -> ComponentHealth {
        let mut details = HashMap::new();

        let mut fresh = Vec::new();
        let mut missing = Vec::new();
        for key in self.expected_keys() {
            if self.cache.exists(key.as_str()).await {
                fresh.push(key.as_str());
            } else {
                missing.push(key.as_str());
            }
        }
        details.insert(
            "fetcher".to_string(),
            serde_json::json!(self.collector.fetcher_name()),
        );
        details.insert("fresh_datasets".to_string(), serde_json::json!(fresh));
        details.insert("missing_datasets".to_string(), serde_json::json!(missing));

        if let Ok(summary) = self.market_summary().await {
            details.insert("last_cycle".to_string(), serde_json::json!(summary));
        }
        details.insert(
            "sources".to_string(),
            serde_json::json!(self.source_metrics().await),
        );

        let status = if fresh.is_empty() {
            HealthStatus::Unhealthy
        } else if !missing.is_empty() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Data hub is serving fresh data".to_string(),
            HealthStatus::Degraded => format!(
                "Data hub is missing {} dataset(s): {}",
                missing.len(),
                missing.join(", ")
            ),
            HealthStatus::Unhealthy => "Data hub has no cached data".to_string(),
        };

        ComponentHealth {
            name: "data_hub".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::Fixture;
    use crate::types::CycleStatus;
    use std::time::Duration;

    fn hub(fx: &Fixture) -> DataHub {
        DataHub::with_components(
            fx.collector.clone(),
            Arc::new(MetricsCollector::new()),
            fx.clock.clone(),
        )
    }

    fn symbols(response: &DatasetResponse) -> Vec<&str> {
        response.data.iter().map(|r| r.symbol()).collect()
    }

    #[tokio::test]
    async fn test_empty_cache_reports_not_available() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);

        let err = hub.get_data(CacheKey::MarketPrices).await.unwrap_err();
        assert_eq!(err, QueryError::not_available("market_prices"));
        assert_eq!(err.status_code(), 404);
        assert!(hub.market_summary().await.is_err());
        assert!(hub.top_staking(None).await.is_err());
        assert_eq!(fx.fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_data_or_refresh_runs_cycle_on_miss() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);

        let value = hub
            .get_data_or_refresh(CacheKey::StakingData)
            .await
            .unwrap();
        assert_eq!(value.as_dataset().unwrap().len(), 3);
        assert_eq!(fx.fetcher.call_count(), 3);

        // Served from cache the second time
        hub.get_data_or_refresh(CacheKey::StakingData).await.unwrap();
        assert_eq!(fx.fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_market_prices_filters() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        hub.refresh_now().await;

        let all = hub.market_prices(DataQuery::new()).await.unwrap();
        assert_eq!(all.count, 4);
        assert_eq!(all.source, "coingecko");

        let limited = hub.market_prices(DataQuery::new().limit(2)).await.unwrap();
        assert_eq!(symbols(&limited), vec!["BTC", "ETH"]);

        let picked = hub
            .market_prices(DataQuery::new().symbols("sol, eth"))
            .await
            .unwrap();
        assert_eq!(symbols(&picked), vec!["ETH", "SOL"]);
    }

    #[tokio::test]
    async fn test_staking_queries() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        hub.refresh_now().await;

        let top = hub.top_staking(Some(2)).await.unwrap();
        assert_eq!(symbols(&top), vec!["ATOM", "SOL"]);
        assert_eq!(hub.top_staking(None).await.unwrap().count, 3);

        let eth = hub
            .staking_data(DataQuery::new().symbols("ETH"))
            .await
            .unwrap();
        assert_eq!(eth.count, 1);
        assert_eq!(eth.data[0].staking_apy(), Some(5.2));
    }

    #[tokio::test]
    async fn test_defi_category_filter() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        hub.refresh_now().await;

        let lending = hub
            .defi_data(DataQuery::new().category("lending"))
            .await
            .unwrap();
        assert_eq!(symbols(&lending), vec!["AAVE"]);
        assert_eq!(lending.source, "defillama");
    }

    #[tokio::test]
    async fn test_search() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);

        // Blank queries are rejected before the cache is consulted
        assert!(matches!(
            hub.search("  ").await,
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            hub.search("eth").await,
            Err(QueryError::NotAvailable { .. })
        ));

        hub.refresh_now().await;
        let found = hub.search(" Cosmos ").await.unwrap();
        assert_eq!(symbols(&found), vec!["ATOM"]);
        assert_eq!(found.query.as_deref(), Some("Cosmos"));

        let by_symbol = hub.search("SOL").await.unwrap();
        assert_eq!(symbols(&by_symbol), vec!["SOL"]);
    }

    #[tokio::test]
    async fn test_coin_joins_staking_record() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        hub.refresh_now().await;

        let eth = hub.coin("eth").await.unwrap();
        assert_eq!(eth.symbol, "ETH");
        assert_eq!(eth.market_data.current_price, 2650.0);
        assert_eq!(eth.staking_data.unwrap().min_stake, 32.0);

        let btc = hub.coin("BTC").await.unwrap();
        assert!(btc.staking_data.is_none());

        assert_eq!(
            hub.coin("xyz").await.unwrap_err(),
            QueryError::not_available("XYZ")
        );
    }

    #[tokio::test]
    async fn test_queries_stop_after_ttl() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        let report = hub.refresh_now().await;
        assert_eq!(report.status(), CycleStatus::Success);
        assert_eq!(hub.market_summary().await.unwrap(), report.summary);

        fx.clock.advance(Duration::from_secs(300));
        assert!(hub.market_prices(DataQuery::new()).await.is_err());
        assert!(hub.market_summary().await.is_err());
    }

    #[tokio::test]
    async fn test_health_check() {
        let fx = Fixture::new(HubConfig::default()).all_ok();
        let hub = hub(&fx);
        assert_eq!(hub.health_check().await.status, HealthStatus::Unhealthy);

        fx.fetcher
            .set_error(&fx.defi_request(), FetchError::rate_limited("defillama"));
        hub.refresh_now().await;
        let health = hub.health_check().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.details["missing_datasets"], serde_json::json!(["defi_data"]));
        assert_eq!(health.details["last_cycle"]["status"], "partial");

        fx.fetcher.set_response(&fx.defi_request(), crate::collector::tests::defi_payload());
        hub.refresh_now().await;
        let health = hub.health_check().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.name, "data_hub");
        assert_eq!(health.details["fetcher"], "mock");
    }

    #[tokio::test]
    async fn test_health_ignores_disabled_defi() {
        let config = HubConfig {
            enable_defi: false,
            ..HubConfig::default()
        };
        let fx = Fixture::new(config).all_ok();
        let hub = hub(&fx);
        hub.refresh_now().await;
        assert_eq!(hub.health_check().await.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_new_builds_http_stack() {
        assert!(DataHub::new(HubConfig::default()).is_ok());
    }
}
