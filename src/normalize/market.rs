//! CoinGecko `/coins/markets` normalizer

use super::{
    canonical_symbol, optional_f64, optional_str, payload_items, required_f64, required_str,
    skip_partial,
};
use crate::{
    error::RecordError,
    types::{CanonicalRecord, MarketRecord},
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Fields shared by the market and staking normalizers
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CoinFields {
    pub id: Option<String>,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: Option<u32>,
    pub total_volume: f64,
    pub price_change_1h: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
}

impl CoinFields {
    /// Parses one market item; `symbol` and `current_price` are required
    pub(crate) fn parse(item: &Value) -> Result<Self, RecordError> {
        let symbol = canonical_symbol(&required_str(item, "symbol")?);
        let current_price = required_f64(item, "current_price")?;
        let id = optional_str(item, "id");
        let name = optional_str(item, "name")
            .or_else(|| id.clone())
            .unwrap_or_else(|| symbol.clone());

        Ok(Self {
            id,
            name,
            current_price,
            market_cap: optional_f64(item, "market_cap").unwrap_or(0.0),
            market_cap_rank: item
                .get("market_cap_rank")
                .and_then(Value::as_u64)
                .and_then(|r| u32::try_from(r).ok()),
            total_volume: optional_f64(item, "total_volume").unwrap_or(0.0),
            price_change_1h: optional_f64(item, "price_change_percentage_1h_in_currency")
                .unwrap_or(0.0),
            price_change_24h: optional_f64(item, "price_change_percentage_24h_in_currency")
                .or_else(|| optional_f64(item, "price_change_percentage_24h"))
                .unwrap_or(0.0),
            price_change_7d: optional_f64(item, "price_change_percentage_7d_in_currency")
                .unwrap_or(0.0),
            symbol,
        })
    }
}

/// Parses every valid coin of a markets payload, in provider order
///
/// Coins without a provider rank are ranked by their position in the output.
pub(crate) fn parse_coins(raw: &Value, family: &str) -> Vec<(CoinFields, u32)> {
    payload_items(raw, family)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match CoinFields::parse(item) {
            Ok(coin) => Some(coin),
            Err(err) => skip_partial(family, index, err),
        })
        .enumerate()
        .map(|(position, coin)| {
            let rank = coin
                .market_cap_rank
                .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX));
            (coin, rank)
        })
        .collect()
}

/// Normalizes a CoinGecko markets payload into market price records
pub fn normalize_market(raw: &Value, now: DateTime<Utc>) -> Vec<CanonicalRecord> {
    parse_coins(raw, "market")
        .into_iter()
        .map(|(coin, rank)| {
            CanonicalRecord::MarketPrice(MarketRecord {
                id: coin.id,
                symbol: coin.symbol,
                name: coin.name,
                current_price: coin.current_price,
                market_cap: coin.market_cap,
                market_cap_rank: rank,
                total_volume: coin.total_volume,
                price_change_1h: coin.price_change_1h,
                price_change_24h: coin.price_change_24h,
                price_change_7d: coin.price_change_7d,
                last_updated: now,
            })
        })
        .collect()
}
