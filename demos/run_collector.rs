use crypto_data_hub::{CacheKey, DataHub, DataQuery, HubConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = HubConfig::from_env()?;
    println!(
        "Data hub (interval {:?}, ttl {:?}, defi {})",
        config.collection_interval,
        config.cache_ttl,
        if config.enable_defi { "on" } else { "off" }
    );
    println!("-------------------------------------------");

    let hub = DataHub::new(config)?;

    // 1. One cycle up front to measure a full collection
    let start = Instant::now();
    let report = hub.refresh_now().await;
    println!(
        "Cycle: {:?} in {:?} (coins={}, staking={}, defi={:?})",
        report.status(),
        start.elapsed(),
        report.summary.total_coins,
        report.summary.total_staking,
        report.summary.total_defi
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(count) => println!("   {:<15} {} records", outcome.key.as_str(), count),
            Err(e) => println!("   {:<15} failed: {}", outcome.key.as_str(), e),
        }
    }

    // 2. A few reads against the cache
    if let Ok(top) = hub.top_staking(Some(5)).await {
        println!("Top staking:");
        for record in &top.data {
            println!(
                "   {:<6} {:>6.2}%",
                record.symbol(),
                record.staking_apy().unwrap_or(0.0)
            );
        }
    }
    match hub.market_prices(DataQuery::new().symbols("btc,eth,sol")).await {
        Ok(prices) => println!("Market prices: {} of requested coins cached", prices.count),
        Err(e) => println!("Market prices unavailable: {}", e),
    }
    if let Ok(value) = hub.get_data(CacheKey::DefiData).await {
        if let Some(defi) = value.as_dataset() {
            println!("DeFi protocols cached: {}", defi.len());
        }
    }

    let health = hub.health_check().await;
    println!("Health: {:?} ({})", health.status, health.message.unwrap_or_default());

    // 3. Keep collecting until Ctrl+C
    let scheduler = hub.start_scheduler();
    println!("Scheduler running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await;

    for metrics in hub.source_metrics().await {
        println!(
            "{}: p50={:.0}ms p99={:.0}ms success={:.1}% ({} requests)",
            metrics.source,
            metrics.latency_p50_ms,
            metrics.latency_p99_ms,
            metrics.success_rate * 100.0,
            metrics.total_requests
        );
    }

    Ok(())
}
