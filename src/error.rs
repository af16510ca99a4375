//! Error types for the data hub

use thiserror::Error;

/// Errors that can occur when fetching a payload from a provider
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// The per-source rate window is full; the request was not sent
    #[error("Rate limit exceeded for {provider}")]
    RateLimited { provider: String },

    /// Transport failure or non-2xx response
    #[error("Network error for {provider}: {message}")]
    Network {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Response body was not valid JSON
    #[error("Decode error for {provider}: {message}")]
    Decode { provider: String, message: String },
}

impl FetchError {
    /// Creates a RateLimited error
    pub fn rate_limited(source: &str) -> Self {
        Self::RateLimited {
            provider: source.to_string(),
        }
    }

    /// Creates a Network error
    pub fn network(source: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: source.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Creates a Decode error
    pub fn decode(source: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            provider: source.to_string(),
            message: message.into(),
        }
    }

    /// The source key the failed request was made against
    pub fn source_key(&self) -> &str {
        match self {
            FetchError::RateLimited { provider }
            | FetchError::Network { provider, .. }
            | FetchError::Decode { provider, .. } => provider,
        }
    }
}

/// A single provider item that could not be normalized
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    /// A required field is missing or has the wrong type
    #[error("Partial record: missing or invalid field `{field}`")]
    PartialRecord { field: &'static str },
}

/// Why a collection pipeline produced no dataset this cycle
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// The fetch step failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The payload normalized to zero records
    #[error("No records produced for {key}")]
    Empty { key: String },
}

/// Errors returned by the read-side query facade
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    /// Nothing cached (or the entry expired) for this key
    #[error("No data available for {key}")]
    NotAvailable { key: String },

    /// The caller supplied an unusable query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl QueryError {
    /// Creates a NotAvailable error
    pub fn not_available(key: &str) -> Self {
        Self::NotAvailable {
            key: key.to_string(),
        }
    }

    /// Creates an InvalidQuery error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// HTTP status an API layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::NotAvailable { .. } => 404,
            QueryError::InvalidQuery(_) => 400,
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// An environment variable held an unparsable value
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}
