//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring ad coordinators.
//!
//! # Metrics
//!
//! - `mediation_load_requests_total` - Loads requested from the SDK
//! - `mediation_load_failures_total` - Load failures reported by the SDK
//! - `mediation_retries_scheduled_total` - Retry timers scheduled
//! - `mediation_retry_delay_seconds` - Histogram of retry delays
//! - `mediation_show_requests_total` - Show calls forwarded to the SDK
//! - `mediation_stale_callbacks_total` - Callbacks and timers dropped after teardown
//!
//! Every collector carries a `format` label.

use crate::types::AdFormat;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Loads requested
    pub load_requests: IntCounterVec,

    /// Load failures
    pub load_failures: IntCounterVec,

    /// Retries scheduled
    pub retries_scheduled: IntCounterVec,

    /// Retry delay histogram
    pub retry_delay: HistogramVec,

    /// Show requests forwarded to the SDK
    pub show_requests: IntCounterVec,

    /// Callbacks or timer fires after teardown
    pub stale_callbacks: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let load_requests = IntCounterVec::new(
            Opts::new("mediation_load_requests_total", "Loads requested from the SDK"),
            &["format"],
        )?;
        registry.register(Box::new(load_requests.clone()))?;

        let load_failures = IntCounterVec::new(
            Opts::new("mediation_load_failures_total", "Load failures reported by the SDK"),
            &["format"],
        )?;
        registry.register(Box::new(load_failures.clone()))?;

        let retries_scheduled = IntCounterVec::new(
            Opts::new("mediation_retries_scheduled_total", "Retry timers scheduled"),
            &["format"],
        )?;
        registry.register(Box::new(retries_scheduled.clone()))?;

        let retry_delay = HistogramVec::new(
            HistogramOpts::new("mediation_retry_delay_seconds", "Histogram of retry delays")
                .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0]),
            &["format"],
        )?;
        registry.register(Box::new(retry_delay.clone()))?;

        let show_requests = IntCounterVec::new(
            Opts::new("mediation_show_requests_total", "Show calls forwarded to the SDK"),
            &["format"],
        )?;
        registry.register(Box::new(show_requests.clone()))?;

        let stale_callbacks = IntCounterVec::new(
            Opts::new(
                "mediation_stale_callbacks_total",
                "Callbacks and timers dropped after teardown",
            ),
            &["format"],
        )?;
        registry.register(Box::new(stale_callbacks.clone()))?;

        Ok(Self {
            load_requests,
            load_failures,
            retries_scheduled,
            retry_delay,
            show_requests,
            stale_callbacks,
            registry,
        })
    }

    /// Record load request
    pub fn record_load_request(&self, format: AdFormat) {
        self.load_requests.with_label_values(&[format.as_str()]).inc();
    }

    /// Record load failure
    pub fn record_load_failure(&self, format: AdFormat) {
        self.load_failures.with_label_values(&[format.as_str()]).inc();
    }

    /// Record scheduled retry
    pub fn record_retry_scheduled(&self, format: AdFormat, delay_seconds: f64) {
        self.retries_scheduled
            .with_label_values(&[format.as_str()])
            .inc();
        self.retry_delay
            .with_label_values(&[format.as_str()])
            .observe(delay_seconds);
    }

    /// Record show request
    pub fn record_show_request(&self, format: AdFormat) {
        self.show_requests.with_label_values(&[format.as_str()]).inc();
    }

    /// Record stale callback
    pub fn record_stale_callback(&self, format: AdFormat) {
        self.stale_callbacks
            .with_label_values(&[format.as_str()])
            .inc();
    }

    /// Loads requested so far for a format
    pub fn load_requests(&self, format: AdFormat) -> u64 {
        self.load_requests.with_label_values(&[format.as_str()]).get()
    }

    /// Load failures so far for a format
    pub fn load_failures(&self, format: AdFormat) -> u64 {
        self.load_failures.with_label_values(&[format.as_str()]).get()
    }

    /// Retries scheduled so far for a format
    pub fn retries_scheduled(&self, format: AdFormat) -> u64 {
        self.retries_scheduled
            .with_label_values(&[format.as_str()])
            .get()
    }

    /// Show requests so far for a format
    pub fn show_requests(&self, format: AdFormat) -> u64 {
        self.show_requests.with_label_values(&[format.as_str()]).get()
    }

    /// Stale callbacks so far for a format
    pub fn stale_callbacks(&self, format: AdFormat) -> u64 {
        self.stale_callbacks
            .with_label_values(&[format.as_str()])
            .get()
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.load_requests(AdFormat::Banner), 0);
        assert_eq!(metrics.stale_callbacks(AdFormat::Native), 0);
    }

    #[test]
    fn test_two_collectors_do_not_collide() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_load_request(AdFormat::Interstitial);
        assert_eq!(a.load_requests(AdFormat::Interstitial), 1);
        assert_eq!(b.load_requests(AdFormat::Interstitial), 0);
    }

    #[test]
    fn test_labels_are_per_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_load_failure(AdFormat::RewardedVideo);
        metrics.record_retry_scheduled(AdFormat::RewardedVideo, 2.0);
        metrics.record_show_request(AdFormat::AppOpen);

        assert_eq!(metrics.load_failures(AdFormat::RewardedVideo), 1);
        assert_eq!(metrics.load_failures(AdFormat::AppOpen), 0);
        assert_eq!(metrics.retries_scheduled(AdFormat::RewardedVideo), 1);
        assert_eq!(metrics.show_requests(AdFormat::AppOpen), 1);

        let families = metrics.registry().gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "mediation_retry_delay_seconds"));
    }
}
