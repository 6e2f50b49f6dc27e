//! Prometheus metrics collection for recipe-relay
//!
//! Tracks every outbound call to an upstream AI service:
//! - Call counts by service and outcome
//! - Call latency by service
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Upstream service label
///
/// Restricting labels to an enum keeps cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// OpenAI chat completions
    Chat,
    /// OpenAI image generations
    Dalle,
    /// fal.ai queue
    Fal,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Chat => "chat",
            Service::Dalle => "dalle",
            Service::Fal => "fal",
        }
    }
}

/// Outcome label for an upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Metrics collector for recipe-relay
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    upstream_requests: IntCounterVec,
    upstream_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 3 services × 2 outcomes = 6 time series
        let upstream_requests = IntCounterVec::new(
            Opts::new(
                "recipe_relay_upstream_requests_total",
                "Total upstream AI service calls by service and outcome",
            ),
            &["service", "outcome"],
        )?;

        // Image generation routinely takes tens of seconds
        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "recipe_relay_upstream_duration_seconds",
                "Upstream AI service call latency in seconds",
            )
            .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0]),
            &["service"],
        )?;

        registry.register(Box::new(upstream_requests.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            upstream_requests,
            upstream_duration,
        })
    }

    /// Record one finished upstream call
    ///
    /// Recording failures are logged and swallowed; a metrics problem
    /// never fails the request that triggered it.
    pub fn record_upstream(&self, service: Service, outcome: Outcome, elapsed: Duration) {
        match self
            .upstream_requests
            .get_metric_with_label_values(&[service.as_str(), outcome.as_str()])
        {
            Ok(counter) => counter.inc(),
            Err(e) => tracing::error!(
                error = %e,
                service = service.as_str(),
                "Failed to record upstream request metric"
            ),
        }

        match self
            .upstream_duration
            .get_metric_with_label_values(&[service.as_str()])
        {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(e) => tracing::error!(
                error = %e,
                service = service.as_str(),
                "Failed to record upstream duration metric"
            ),
        }
    }

    /// Number of recorded calls for a service/outcome pair
    pub fn upstream_count(&self, service: Service, outcome: Outcome) -> u64 {
        self.upstream_requests
            .get_metric_with_label_values(&[service.as_str(), outcome.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Gather all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
