//! Read-side query filters and response shapes

use crate::{
    error::QueryError,
    types::{CanonicalRecord, Dataset, MarketRecord, StakingRecord},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filters applied to a cached dataset before it is returned
///
/// Filters run in order: `symbols`, `category`, `q`, then `limit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuery {
    /// Maximum number of records returned
    pub limit: Option<usize>,
    /// Comma-separated tickers, case-insensitive (e.g. "eth,sol")
    pub symbols: Option<String>,
    /// DeFi category, case-insensitive exact match
    pub category: Option<String>,
    /// Case-insensitive substring of name or symbol
    pub q: Option<String>,
}

impl DataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn symbols(mut self, symbols: impl Into<String>) -> Self {
        self.symbols = Some(symbols.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    /// Uppercased tickers from `symbols`, empty entries dropped
    fn symbol_list(&self) -> Vec<String> {
        self.symbols
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lowercased search term
    ///
    /// # Errors
    /// `InvalidQuery` if `q` is present but blank
    fn search_term(&self) -> Result<Option<String>, QueryError> {
        match self.q.as_deref().map(str::trim) {
            Some("") => Err(QueryError::invalid("Query parameter is required")),
            Some(q) => Ok(Some(q.to_lowercase())),
            None => Ok(None),
        }
    }

    /// Filters `records`, truncating to `limit` or else `default_limit`
    pub fn apply(
        &self,
        records: &[CanonicalRecord],
        default_limit: Option<usize>,
    ) -> Result<Vec<CanonicalRecord>, QueryError> {
        let symbols = self.symbol_list();
        let category = self.category.as_deref().map(|c| c.trim().to_lowercase());
        let term = self.search_term()?;

        let filtered = records
            .iter()
            .filter(|r| symbols.is_empty() || symbols.iter().any(|s| s == r.symbol()))
            .filter(|r| match &category {
                Some(wanted) => r.category().is_some_and(|c| c.to_lowercase() == *wanted),
                None => true,
            })
            .filter(|r| match &term {
                Some(term) => {
                    r.name().to_lowercase().contains(term.as_str())
                        || r.symbol().to_lowercase().contains(term.as_str())
                }
                None => true,
            })
            .cloned();

        Ok(match self.limit.or(default_limit) {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        })
    }
}

/// A dataset as returned across the API boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetResponse {
    pub data: Vec<CanonicalRecord>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// Echo of the search term, only for searches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl DatasetResponse {
    /// Wraps `data` with the timestamp and source of the dataset it came from
    pub fn from_dataset(dataset: &Dataset, data: Vec<CanonicalRecord>) -> Self {
        Self {
            count: data.len(),
            data,
            timestamp: dataset.timestamp,
            source: dataset.source.clone(),
            query: None,
        }
    }
}

/// Error body for the API boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: &QueryError, timestamp: DateTime<Utc>) -> Self {
        Self {
            error: error.to_string(),
            timestamp,
        }
    }
}

impl From<&QueryError> for ErrorResponse {
    fn from(error: &QueryError) -> Self {
        Self::new(error, Utc::now())
    }
}

/// Market record of one coin joined with its staking record, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinView {
    pub symbol: String,
    pub market_data: MarketRecord,
    pub staking_data: Option<StakingRecord>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DefiRecord;

    fn defi(symbol: &str, name: &str, category: &str) -> CanonicalRecord {
        CanonicalRecord::Defi(DefiRecord {
            symbol: symbol.to_string(),
            name: name.to_string(),
            tvl: 1.0e9,
            tvl_change_24h: 0.0,
            category: category.to_string(),
            chains: vec!["Ethereum".to_string()],
            last_updated: Utc::now(),
        })
    }

    fn records() -> Vec<CanonicalRecord> {
        vec![
            defi("LDO", "Lido", "Liquid Staking"),
            defi("AAVE", "Aave", "Lending"),
            defi("COMP", "Compound", "Lending"),
            defi("", "Curve LlamaLend", "Lending"),
        ]
    }

    fn names(records: &[CanonicalRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_empty_query_applies_default_limit() {
        let all = DataQuery::new().apply(&records(), None).unwrap();
        assert_eq!(all.len(), 4);

        let limited = DataQuery::new().apply(&records(), Some(2)).unwrap();
        assert_eq!(names(&limited), vec!["Lido", "Aave"]);

        let explicit = DataQuery::new().limit(3).apply(&records(), Some(2)).unwrap();
        assert_eq!(explicit.len(), 3);
    }

    #[test]
    fn test_symbols_filter() {
        let found = DataQuery::new()
            .symbols(" ldo, comp ,,")
            .apply(&records(), None)
            .unwrap();
        assert_eq!(names(&found), vec!["Lido", "Compound"]);

        // A blank list filters nothing
        let all = DataQuery::new().symbols(" , ").apply(&records(), None).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let lending = DataQuery::new()
            .category("LENDING")
            .apply(&records(), None)
            .unwrap();
        assert_eq!(names(&lending), vec!["Aave", "Compound", "Curve LlamaLend"]);

        let none = DataQuery::new().category("lend").apply(&records(), None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_search_matches_name_or_symbol() {
        let by_name = DataQuery::new().search("llama").apply(&records(), None).unwrap();
        assert_eq!(names(&by_name), vec!["Curve LlamaLend"]);

        let by_symbol = DataQuery::new().search("Ldo").apply(&records(), None).unwrap();
        assert_eq!(names(&by_symbol), vec!["Lido"]);
    }

    #[test]
    fn test_blank_search_is_rejected() {
        let err = DataQuery::new().search("   ").apply(&records(), None).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_response_shapes() {
        let dataset = Dataset::new("defillama", Utc::now(), records());
        let response = DatasetResponse::from_dataset(&dataset, dataset.data[..1].to_vec());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["source"], "defillama");
        assert_eq!(json["data"][0]["record_type"], "defi");
        assert!(json.get("query").is_none());

        let error = ErrorResponse::from(&QueryError::not_available("defi_data"));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"], "No data available for defi_data");
        assert!(json["timestamp"].is_string());
    }
}
