//! DefiLlama `/protocols` normalizer

use super::{
    canonical_symbol, optional_f64, optional_str, payload_items, required_f64, required_str,
    skip_partial,
};
use crate::{
    error::RecordError,
    types::{CanonicalRecord, DefiRecord},
};
use chrono::{DateTime, Utc};
use serde_json::Value;

const UNKNOWN_CATEGORY: &str = "Unknown";

fn parse_protocol(item: &Value, now: DateTime<Utc>) -> Result<DefiRecord, RecordError> {
    let name = required_str(item, "name")?;
    let tvl = required_f64(item, "tvl")?;

    // DefiLlama uses "-" for protocols without a token
    let symbol = optional_str(item, "symbol")
        .filter(|s| s != "-")
        .map(|s| canonical_symbol(&s))
        .unwrap_or_default();

    let chains = item
        .get("chains")
        .and_then(Value::as_array)
        .map(|chains| {
            chains
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(DefiRecord {
        symbol,
        name,
        tvl,
        tvl_change_24h: optional_f64(item, "change_1d").unwrap_or(0.0),
        category: optional_str(item, "category")
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        chains,
        last_updated: now,
    })
}

/// Normalizes a DefiLlama protocol list, keeping at most `cap` protocols
pub fn normalize_defi(raw: &Value, cap: usize, now: DateTime<Utc>) -> Vec<CanonicalRecord> {
    payload_items(raw, "defi")
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse_protocol(item, now) {
            Ok(record) => Some(CanonicalRecord::Defi(record)),
            Err(err) => skip_partial("defi", index, err),
        })
        .take(cap)
        .collect()
}
