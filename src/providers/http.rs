//! Rate-limited HTTP fetcher

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::FetchError,
    fetcher::{FetchRequest, JsonFetcher},
    metrics::MetricsCollector,
    rate_limiter::RateLimiter,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// HTTP GET fetcher with per-source admission control
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
}

impl HttpFetcher {
    /// Creates a fetcher with the default request timeout
    pub fn new(
        limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, FetchError> {
        Self::with_timeout(limiter, metrics, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Creates a fetcher whose requests give up after `timeout`
    pub fn with_timeout(
        limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsCollector>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::network("http", None, e.to_string()))?;

        Ok(Self {
            client,
            limiter,
            metrics,
        })
    }

    async fn get_json(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        let source = request.source.as_str();

        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timed out: {}", e)
                } else {
                    e.to_string()
                };
                FetchError::network(source, e.status().map(|s| s.as_u16()), message)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::network(
                source,
                Some(status.as_u16()),
                format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(source, Some(status.as_u16()), e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            FetchError::decode(
                source,
                format!("Failed to parse response from {}: {}", request.url, e),
            )
        })
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        if !self.limiter.admit(&request.source) {
            return Err(FetchError::rate_limited(&request.source));
        }

        tracing::debug!(source = %request.source, url = %request.url, "Fetching payload");
        let start = Instant::now();
        let result = self.get_json(request).await;
        self.metrics
            .record_request(&request.source, start.elapsed(), result.is_ok())
            .await;

        match &result {
            Ok(_) => tracing::debug!(
                source = %request.source,
                latency_ms = start.elapsed().as_millis() as u64,
                "Fetched payload"
            ),
            Err(e) => tracing::warn!(source = %request.source, error = %e, "Fetch failed"),
        }

        result
    }

    fn fetcher_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::HashMap;

    fn fetcher(limit: usize) -> (HttpFetcher, Arc<MetricsCollector>) {
        fetcher_with_timeout(limit, Duration::from_secs(5))
    }

    fn fetcher_with_timeout(
        limit: usize,
        timeout: Duration,
    ) -> (HttpFetcher, Arc<MetricsCollector>) {
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(RateLimiter::with_limits(
            HashMap::from([("test".to_string(), limit)]),
            clock,
        ));
        let metrics = Arc::new(MetricsCollector::new());
        let fetcher =
            HttpFetcher::with_timeout(limiter, metrics.clone(), timeout).expect("client");
        (fetcher, metrics)
    }

    #[tokio::test]
    async fn test_fetch_decodes_json_and_sends_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(mockito::Matcher::UrlEncoded(
                "vs_currency".into(),
                "usd".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"symbol":"btc"}]"#)
            .create_async()
            .await;

        let (fetcher, metrics) = fetcher(10);
        let request = FetchRequest::new(format!("{}/coins/markets", server.url()), "test")
            .param("vs_currency", "usd");
        let value = fetcher.fetch(&request).await.unwrap();

        assert_eq!(value[0]["symbol"], "btc");
        mock.assert_async().await;
        assert_eq!(metrics.get_metrics("test").await.total_requests, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_request_does_no_io() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/protocols")
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let (fetcher, _) = fetcher(1);
        let request = FetchRequest::new(format!("{}/protocols", server.url()), "test");

        assert!(fetcher.fetch(&request).await.is_ok());
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert_eq!(err, FetchError::rate_limited("test"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/protocols")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let (fetcher, metrics) = fetcher(10);
        let request = FetchRequest::new(format!("{}/protocols", server.url()), "test");
        match fetcher.fetch(&request).await {
            Err(FetchError::Network { status, .. }) => assert_eq!(status, Some(503)),
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(metrics.get_metrics("test").await.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_invalid_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/protocols")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let (fetcher, _) = fetcher(10);
        let request = FetchRequest::new(format!("{}/protocols", server.url()), "test");
        assert!(matches!(
            fetcher.fetch(&request).await,
            Err(FetchError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_network_error() {
        // Bind then drop a listener so nothing is accepting on that port
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let (fetcher, _) = fetcher(10);
        let request = FetchRequest::new(format!("http://127.0.0.1:{}/protocols", port), "test");
        assert!(matches!(
            fetcher.fetch(&request).await,
            Err(FetchError::Network { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections and holds them open without ever answering
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let (fetcher, metrics) = fetcher_with_timeout(10, Duration::from_millis(200));
        let request = FetchRequest::new(format!("http://{}/protocols", addr), "test");

        let started = Instant::now();
        let result = fetcher.fetch(&request).await;
        let elapsed = started.elapsed();

        match result {
            Err(FetchError::Network {
                status: None,
                message,
                ..
            }) => assert!(
                message.contains("timed out"),
                "unexpected message: {}",
                message
            ),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
        assert_eq!(metrics.get_metrics("test").await.failed_requests, 1);

        server.abort();
    }
}
