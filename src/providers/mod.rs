//! Provider endpoints and the HTTP fetcher

pub mod coingecko;
pub mod defillama;
pub mod http;

pub use http::HttpFetcher;
