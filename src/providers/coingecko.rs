//! CoinGecko endpoints

use crate::{
    constants::{COINGECKO_MARKETS_ENDPOINT, SOURCE_COINGECKO},
    fetcher::FetchRequest,
};

/// Builds the `/coins/markets` request for the top `per_page` coins by
/// market cap, with 1h/24h/7d price change percentages
pub fn markets_request(base_url: &str, per_page: usize) -> FetchRequest {
    FetchRequest::new(
        format!("{}{}", base_url.trim_end_matches('/'), COINGECKO_MARKETS_ENDPOINT),
        SOURCE_COINGECKO,
    )
    .param("vs_currency", "usd")
    .param("order", "market_cap_desc")
    .param("per_page", per_page)
    .param("page", 1)
    .param("sparkline", false)
    .param("price_change_percentage", "1h,24h,7d")
}
