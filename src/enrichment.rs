//! Staking APY reference data
//!
//! [`StaticApyTable`] ships a fixed table of staking terms for well-known
//! proof-of-stake networks. Anything that can answer [`ApyLookup::lookup`]
//! can replace it, e.g. a client for a live APY aggregation service.

use crate::types::{Confidence, StakingEnrichment};
use std::collections::HashMap;

/// Resolves staking terms for a ticker
pub trait ApyLookup: Send + Sync {
    /// Returns the staking terms for `symbol`
    ///
    /// Total: unknown symbols resolve to [`StakingEnrichment::fallback`].
    fn lookup(&self, symbol: &str) -> StakingEnrichment;
}

/// (symbol, apy, stake type, min stake, unbonding days)
const STAKING_TABLE: &[(&str, f64, &str, f64, u32)] = &[
    ("ETH", 5.2, "Proof of Stake", 32.0, 0),
    ("ADA", 4.8, "Proof of Stake", 0.0, 0),
    ("SOL", 7.1, "Proof of Stake", 0.0, 0),
    ("DOT", 12.5, "Nominated Proof of Stake", 0.0, 28),
    ("AVAX", 8.9, "Proof of Stake", 25.0, 0),
    ("MATIC", 4.2, "Proof of Stake", 0.0, 0),
    ("ATOM", 19.8, "Proof of Stake", 0.0, 21),
    ("NEAR", 11.2, "Proof of Stake", 0.0, 0),
    ("ALGO", 4.1, "Pure Proof of Stake", 0.0, 0),
    ("XTZ", 5.5, "Liquid Proof of Stake", 0.0, 0),
    ("KSM", 15.2, "Nominated Proof of Stake", 0.0, 7),
    ("LUNA", 6.8, "Proof of Stake", 0.0, 21),
    ("OSMO", 18.5, "Proof of Stake", 0.0, 14),
    ("JUNO", 22.1, "Proof of Stake", 0.0, 28),
    ("SCRT", 25.3, "Proof of Stake", 0.0, 21),
];

/// Label recorded as the APY source for table entries
const TABLE_SOURCE: &str = "stakingrewards";

/// Built-in staking table
pub struct StaticApyTable {
    entries: HashMap<String, StakingEnrichment>,
}

impl StaticApyTable {
    pub fn new() -> Self {
        let entries = STAKING_TABLE
            .iter()
            .map(|(symbol, apy, stake_type, min_stake, unbonding)| {
                (
                    symbol.to_string(),
                    StakingEnrichment {
                        apy: *apy,
                        source_label: TABLE_SOURCE.to_string(),
                        confidence: Confidence::High,
                        stake_type: stake_type.to_string(),
                        min_stake: *min_stake,
                        unbonding_period_days: *unbonding,
                        available: true,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Number of symbols with known staking terms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticApyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ApyLookup for StaticApyTable {
    fn lookup(&self, symbol: &str) -> StakingEnrichment {
        self.entries
            .get(&symbol.trim().to_uppercase())
            .cloned()
            .unwrap_or_else(StakingEnrichment::fallback)
    }
}
