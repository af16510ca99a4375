//! Fetch abstraction for pulling raw JSON payloads from providers

use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;

/// A single GET request against a provider endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Full endpoint URL without query string
    pub url: String,
    /// Rate limiter key (e.g. "coingecko")
    pub source: String,
    /// Query string parameters
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, source: &str) -> Self {
        Self {
            url: url.into(),
            source: source.to_string(),
            params: Vec::new(),
        }
    }

    /// Adds a query string parameter
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

impl std::fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// Trait for payload fetchers
///
/// The HTTP implementation applies per-source rate limiting and a request
/// timeout. Implementations never retry; retry policy belongs to the
/// scheduler.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetches and decodes the JSON body for `request`
    ///
    /// # Returns
    /// The decoded payload, or `RateLimited`, `Network` or `Decode`
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError>;

    /// Returns the name of this fetcher
    fn fetcher_name(&self) -> &'static str;
}
