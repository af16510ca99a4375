//! Staking normalizer
//!
//! Takes the top-N coin list, attaches staking terms from an [`ApyLookup`],
//! keeps only coins that can be staked and orders them by APY.

use super::market::parse_coins;
use crate::{
    enrichment::ApyLookup,
    types::{CanonicalRecord, StakingRecord},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Normalizes a CoinGecko markets payload into staking records
///
/// Only the first `top_n` valid coins are considered. The output is sorted
/// by descending APY; equal APYs keep their market cap order.
pub fn normalize_staking(
    raw: &Value,
    lookup: &dyn ApyLookup,
    top_n: usize,
    now: DateTime<Utc>,
) -> Vec<CanonicalRecord> {
    let mut records: Vec<StakingRecord> = parse_coins(raw, "staking")
        .into_iter()
        .take(top_n)
        .map(|(coin, rank)| {
            let terms = lookup.lookup(&coin.symbol);
            StakingRecord {
                symbol: coin.symbol,
                name: coin.name,
                current_price: coin.current_price,
                market_cap: coin.market_cap,
                market_cap_rank: rank,
                staking_apy: terms.apy,
                staking_apy_source: terms.source_label,
                staking_apy_confidence: terms.confidence,
                staking_available: terms.available,
                staking_type: terms.stake_type,
                min_stake: terms.min_stake,
                unbonding_period_days: terms.unbonding_period_days,
                last_updated: now,
            }
        })
        .filter(|record| record.staking_available)
        .collect();

    // Vec::sort_by is stable
    records.sort_by(|a, b| {
        b.staking_apy
            .partial_cmp(&a.staking_apy)
            .unwrap_or(Ordering::Equal)
    });

    records.into_iter().map(CanonicalRecord::Staking).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::StaticApyTable;
    use crate::types::{Confidence, StakingEnrichment};
    use serde_json::json;

    fn top_coins() -> Value {
        json!([
            {"symbol": "btc", "name": "Bitcoin", "current_price": 64000, "market_cap_rank": 1},
            {"symbol": "eth", "name": "Ethereum", "current_price": 2650, "market_cap_rank": 2},
            {"symbol": "usdt", "name": "Tether", "current_price": 1, "market_cap_rank": 3},
            {"symbol": "sol", "name": "Solana", "current_price": 150, "market_cap_rank": 4},
            {"symbol": "ada", "name": "Cardano", "current_price": 0.48, "market_cap_rank": 5},
            {"symbol": "atom", "name": "Cosmos", "current_price": 7.1, "market_cap_rank": 6},
            {"name": "Broken"}
        ])
    }

    fn staking(records: &[CanonicalRecord]) -> Vec<&StakingRecord> {
        records
            .iter()
            .map(|r| match r {
                CanonicalRecord::Staking(s) => s,
                other => panic!("expected staking record, got {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_filters_unavailable_and_sorts_by_apy() {
        let table = StaticApyTable::new();
        let records = normalize_staking(&top_coins(), &table, 50, Utc::now());
        let records = staking(&records);

        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ATOM", "SOL", "ETH", "ADA"]);
        assert!(records.iter().all(|r| r.staking_available));
        assert!(records
            .windows(2)
            .all(|w| w[0].staking_apy > w[1].staking_apy));

        let atom = records[0];
        assert_eq!(atom.staking_apy, 19.8);
        assert_eq!(atom.staking_apy_confidence, Confidence::High);
        assert_eq!(atom.market_cap_rank, 6);
    }

    #[test]
    fn test_top_n_limits_candidates() {
        let table = StaticApyTable::new();
        let records = normalize_staking(&top_coins(), &table, 2, Utc::now());
        let symbols: Vec<String> = records.iter().map(|r| r.symbol().to_string()).collect();
        assert_eq!(symbols, vec!["ETH"]);
    }

    struct FlatApy;

    impl ApyLookup for FlatApy {
        fn lookup(&self, symbol: &str) -> StakingEnrichment {
            if symbol == "USDT" {
                return StakingEnrichment::fallback();
            }
            StakingEnrichment {
                apy: 5.0,
                source_label: "flat".to_string(),
                confidence: Confidence::Medium,
                stake_type: "Proof of Stake".to_string(),
                min_stake: 0.0,
                unbonding_period_days: 0,
                available: true,
            }
        }
    }

    #[test]
    fn test_ties_keep_market_cap_order() {
        let records = normalize_staking(&top_coins(), &FlatApy, 50, Utc::now());
        let symbols: Vec<&str> = records.iter().map(|r| r.symbol()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "SOL", "ADA", "ATOM"]);
        assert_eq!(staking(&records)[0].staking_apy_source, "flat");
    }

    #[test]
    fn test_empty_payload() {
        let table = StaticApyTable::new();
        assert!(normalize_staking(&json!([]), &table, 50, Utc::now()).is_empty());
    }
}
