//! # Crypto Data Hub
//!
//! Periodically collects market prices, staking opportunities and DeFi
//! protocol TVL from public APIs (CoinGecko, DefiLlama), normalizes them into
//! canonical records and keeps them in a TTL cache for read queries.
//!
//! ## Components
//!
//! - [`RateLimiter`]: sliding 60 second window per source
//! - [`HttpFetcher`]: rate-limited JSON GET with per-source metrics
//! - [`normalize`]: one normalizer per data family
//! - [`StaticApyTable`]: staking APY reference data behind [`ApyLookup`]
//! - [`DataCache`]: key-addressed store with per-entry TTL
//! - [`Collector`]: runs the pipelines of one cycle
//! - [`Scheduler`]: runs cycles on an interval with error backoff
//! - [`DataHub`]: query facade over all of the above
//!
//! ## Usage
//!
//! ```no_run
//! use crypto_data_hub::{DataHub, DataQuery, HubConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hub = DataHub::new(HubConfig::default())?;
//!
//! // Cold start: collect once, then keep refreshing in the background
//! let scheduler = hub.start_scheduler();
//!
//! let top = hub.top_staking(Some(5)).await?;
//! for record in &top.data {
//!     println!("{}: {:.1}% APY", record.symbol(), record.staking_apy().unwrap_or(0.0));
//! }
//!
//! let lending = hub.defi_data(DataQuery::new().category("lending")).await?;
//! println!("{} lending protocols", lending.count);
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod collector;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod fetcher;
pub mod hub;
pub mod metrics;
pub mod normalize;
pub mod providers;
pub mod query;
pub mod rate_limiter;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{Collector, CycleReport, PipelineOutcome};
pub use config::HubConfig;
pub use enrichment::{ApyLookup, StaticApyTable};
pub use error::{ConfigError, FetchError, PipelineError, QueryError, RecordError};
pub use fetcher::{FetchRequest, JsonFetcher};
pub use hub::DataHub;
pub use metrics::{MetricsCollector, SourceMetrics};
pub use providers::HttpFetcher;
pub use query::{CoinView, DataQuery, DatasetResponse, ErrorResponse};
pub use rate_limiter::RateLimiter;
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState};
pub use store::{CacheValue, DataCache};
pub use types::{
    CacheKey, CanonicalRecord, ComponentHealth, Confidence, CycleStatus, Dataset, DefiRecord,
    HealthStatus, MarketRecord, StakingEnrichment, StakingRecord, Summary,
};
