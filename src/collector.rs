//! Collection cycle orchestration
//!
//! One cycle runs the market, staking and DeFi pipelines concurrently. Each
//! pipeline fetches its payload, normalizes it and replaces its dataset in
//! the cache. A pipeline failure only leaves its own key unrefreshed. Once
//! all pipelines finished, a [`Summary`] of the cycle is cached as well.

use crate::{
    clock::Clock,
    config::HubConfig,
    constants::{DEFI_DATASET_SOURCE, MARKET_DATASET_SOURCE, STAKING_DATASET_SOURCE},
    enrichment::ApyLookup,
    error::PipelineError,
    fetcher::JsonFetcher,
    normalize::{normalize_defi, normalize_market, normalize_staking},
    providers::{coingecko, defillama},
    store::DataCache,
    types::{CacheKey, CycleStatus, Dataset, Summary},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Result of one pipeline within a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub key: CacheKey,
    /// Number of records cached, or why nothing was cached
    pub result: Result<usize, PipelineError>,
}

/// What a cycle did, for logging and scheduling decisions
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub summary: Summary,
    pub outcomes: Vec<PipelineOutcome>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn status(&self) -> CycleStatus {
        self.summary.status
    }

    /// Outcome of the pipeline writing `key`, if it ran
    pub fn outcome(&self, key: CacheKey) -> Option<&PipelineOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }
}

/// Runs collection cycles against a shared cache
pub struct Collector {
    fetcher: Arc<dyn JsonFetcher>,
    cache: Arc<DataCache>,
    apy: Arc<dyn ApyLookup>,
    clock: Arc<dyn Clock>,
    config: HubConfig,
    /// Serializes cycles so scheduled and on-demand runs never overlap
    cycle_lock: Mutex<()>,
}

impl Collector {
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        cache: Arc<DataCache>,
        apy: Arc<dyn ApyLookup>,
        clock: Arc<dyn Clock>,
        config: HubConfig,
    ) -> Self {
        Self {
            fetcher,
            cache,
            apy,
            clock,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DataCache> {
        &self.cache
    }

    /// Name of the fetcher behind every pipeline
    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.fetcher_name()
    }

    /// Fetches and normalizes the market price dataset
    pub async fn collect_market(&self) -> Result<Dataset, PipelineError> {
        let request =
            coingecko::markets_request(&self.config.coingecko_url, self.config.market_page_size);
        let raw = self.fetcher.fetch(&request).await?;
        let now = self.clock.now();
        let dataset = Dataset::new(MARKET_DATASET_SOURCE, now, normalize_market(&raw, now));
        non_empty(CacheKey::MarketPrices, dataset)
    }

    /// Fetches the top-N coins and builds the enriched staking dataset
    pub async fn collect_staking(&self) -> Result<Dataset, PipelineError> {
        let request =
            coingecko::markets_request(&self.config.coingecko_url, self.config.staking_top_n);
        let raw = self.fetcher.fetch(&request).await?;
        let now = self.clock.now();
        let records =
            normalize_staking(&raw, self.apy.as_ref(), self.config.staking_top_n, now);
        non_empty(
            CacheKey::StakingData,
            Dataset::new(STAKING_DATASET_SOURCE, now, records),
        )
    }

    /// Fetches and normalizes the DeFi protocol dataset
    pub async fn collect_defi(&self) -> Result<Dataset, PipelineError> {
        let request = defillama::protocols_request(&self.config.defillama_url);
        let raw = self.fetcher.fetch(&request).await?;
        let now = self.clock.now();
        let records = normalize_defi(&raw, self.config.defi_cap, now);
        non_empty(
            CacheKey::DefiData,
            Dataset::new(DEFI_DATASET_SOURCE, now, records),
        )
    }

    /// Runs one pipeline and caches its dataset on success
    async fn refresh(&self, key: CacheKey) -> PipelineOutcome {
        let collected = match key {
            CacheKey::MarketPrices => self.collect_market().await,
            CacheKey::StakingData => self.collect_staking().await,
            CacheKey::DefiData => self.collect_defi().await,
            CacheKey::MarketSummary => Err(PipelineError::Empty {
                key: key.to_string(),
            }),
        };

        let result = match collected {
            Ok(dataset) => {
                let count = dataset.len();
                self.cache
                    .set(key.as_str(), dataset, self.config.cache_ttl)
                    .await;
                tracing::info!(key = %key, count = count, "Dataset refreshed");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Pipeline produced no data, keeping previous entry"
                );
                Err(e)
            }
        };

        PipelineOutcome { key, result }
    }

    /// Runs every enabled pipeline, then caches the cycle summary
    ///
    /// Never fails: pipeline errors are logged and reflected in the
    /// summary's counts and status.
    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        self.run_cycle_locked().await
    }

    /// Runs a cycle only if `key` is still missing once no other cycle runs
    ///
    /// A caller that missed the cache while a cycle was in progress waits
    /// for it and gets `None` if that cycle filled `key`.
    pub async fn run_cycle_if_missing(&self, key: CacheKey) -> Option<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;
        if self.cache.exists(key.as_str()).await {
            tracing::debug!(key = %key, "Filled by a concurrent cycle, skipping refresh");
            return None;
        }
        Some(self.run_cycle_locked().await)
    }

    /// Cycle body; the caller holds `cycle_lock`
    async fn run_cycle_locked(&self) -> CycleReport {
        let start = Instant::now();
        tracing::info!("Starting data collection cycle");

        let (market, staking, defi) = tokio::join!(
            self.refresh(CacheKey::MarketPrices),
            self.refresh(CacheKey::StakingData),
            async {
                if self.config.enable_defi {
                    Some(self.refresh(CacheKey::DefiData).await)
                } else {
                    None
                }
            }
        );

        let count = |outcome: &PipelineOutcome| outcome.result.as_ref().map_or(0, |n| *n);
        let mut outcomes = vec![market, staking];
        outcomes.extend(defi);

        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let status = if succeeded == outcomes.len() {
            CycleStatus::Success
        } else if succeeded == 0 {
            CycleStatus::Failed
        } else {
            CycleStatus::Partial
        };

        let summary = Summary {
            timestamp: self.clock.now(),
            total_coins: count(&outcomes[0]),
            total_staking: count(&outcomes[1]),
            total_defi: outcomes.get(2).map(count),
            status,
        };
        self.cache
            .set(
                CacheKey::MarketSummary.as_str(),
                summary.clone(),
                self.config.cache_ttl,
            )
            .await;

        let duration = start.elapsed();
        tracing::info!(
            status = ?summary.status,
            total_coins = summary.total_coins,
            total_staking = summary.total_staking,
            total_defi = ?summary.total_defi,
            elapsed_ms = duration.as_millis() as u64,
            "Data collection cycle finished"
        );

        CycleReport {
            summary,
            outcomes,
            duration,
        }
    }
}

fn non_empty(key: CacheKey, dataset: Dataset) -> Result<Dataset, PipelineError> {
    if dataset.is_empty() {
        Err(PipelineError::Empty {
            key: key.to_string(),
        })
    } else {
        Ok(dataset)
    }
}
