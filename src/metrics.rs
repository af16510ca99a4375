//! Fetch metrics collection and reporting
//!
//! Tracks latency samples and success rates per data source.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single source
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceMetrics {
    /// Name of the source
    pub source: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of requests tracked
    pub total_requests: u64,
    /// Number of failed requests
    pub failed_requests: u64,
}

impl SourceMetrics {
    /// Creates metrics with no data
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct SourceSamples {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
}

impl SourceSamples {
    fn record(&mut self, duration: Duration, success: bool) {
        self.total_requests += 1;
        if !success {
            self.failed_requests += 1;
        }

        if self.samples.len() >= MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    fn snapshot(&self, source: &str) -> SourceMetrics {
        if self.samples.is_empty() {
            return SourceMetrics::empty(source);
        }

        // Percentiles only consider successful requests
        let mut latencies: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if self.total_requests > 0 {
            (self.total_requests - self.failed_requests) as f64 / self.total_requests as f64
        } else {
            1.0
        };

        SourceMetrics {
            source: source.to_string(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: self.total_requests,
            failed_requests: self.failed_requests,
        }
    }
}

/// Collects request metrics for every source the fetcher talks to
#[derive(Default)]
pub struct MetricsCollector {
    sources: Arc<RwLock<HashMap<String, SourceSamples>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request with its duration and success status
    pub async fn record_request(&self, source: &str, duration: Duration, success: bool) {
        let mut sources = self.sources.write().await;
        sources
            .entry(source.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Computes current metrics for one source
    pub async fn get_metrics(&self, source: &str) -> SourceMetrics {
        let sources = self.sources.read().await;
        sources
            .get(source)
            .map(|s| s.snapshot(source))
            .unwrap_or_else(|| SourceMetrics::empty(source))
    }

    /// Computes metrics for every source seen so far, sorted by name
    pub async fn all_metrics(&self) -> Vec<SourceMetrics> {
        let sources = self.sources.read().await;
        let mut all: Vec<SourceMetrics> = sources
            .iter()
            .map(|(name, samples)| samples.snapshot(name))
            .collect();
        all.sort_by(|a, b| a.source.cmp(&b.source));
        all
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
