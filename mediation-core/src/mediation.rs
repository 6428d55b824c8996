//! Shared mediation context
//!
//! A [`Mediation`] bundles what every ad service needs: the SDK provider,
//! configuration, the analytics sink for default delegates, metrics and the
//! runtime coordinators and bridges run on.

use crate::analytics::{AnalyticsSink, TracingAnalyticsSink};
use crate::config::MediationConfig;
use crate::coordinator::CoordinatorContext;
use crate::debug::{register_mediation_debugger, DebugMenu};
use crate::metrics::Metrics;
use crate::retry::RetryPolicy;
use crate::sdk::AdProvider;
use crate::service::{
    AppOpenService, BannerService, InterstitialService, NativeService, RewardedService,
};
use crate::types::AdUnit;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Mediation context
#[derive(Clone)]
pub struct Mediation {
    provider: Arc<dyn AdProvider>,
    config: MediationConfig,
    analytics: Arc<dyn AnalyticsSink>,
    metrics: Arc<Metrics>,
    runtime: Handle,
}

impl Mediation {
    /// Create new context on the current Tokio runtime
    pub fn new(provider: Arc<dyn AdProvider>, config: MediationConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Concurrency(format!("No Tokio runtime: {}", e)))?;
        Self::with_runtime(provider, config, runtime)
    }

    /// Create new context bound to an explicit runtime
    pub fn with_runtime(
        provider: Arc<dyn AdProvider>,
        config: MediationConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = Arc::new(Metrics::new()?);

        tracing::info!(
            base_delay_ms = config.retry.base_delay_ms,
            max_exponent = config.retry.max_exponent,
            "Mediation context created"
        );

        Ok(Self {
            provider,
            config,
            analytics: Arc::new(TracingAnalyticsSink),
            metrics,
            runtime,
        })
    }

    /// Replace the analytics sink used by default delegates
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// SDK provider
    pub fn provider(&self) -> &Arc<dyn AdProvider> {
        &self.provider
    }

    /// Configuration
    pub fn config(&self) -> &MediationConfig {
        &self.config
    }

    /// Analytics sink
    pub fn analytics(&self) -> Arc<dyn AnalyticsSink> {
        self.analytics.clone()
    }

    /// Metrics
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Runtime coordinators and bridges run on
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Interstitial service with the default delegate
    pub fn interstitial(&self, unit: impl Into<AdUnit>) -> InterstitialService {
        InterstitialService::new(self, unit)
    }

    /// Rewarded service with the default delegate
    pub fn rewarded(&self, unit: impl Into<AdUnit>) -> RewardedService {
        RewardedService::new(self, unit)
    }

    /// App-open service with the default delegate
    pub fn app_open(&self, unit: impl Into<AdUnit>) -> AppOpenService {
        AppOpenService::new(self, unit)
    }

    /// Banner service with the default delegate
    pub fn banner(&self, unit: impl Into<AdUnit>) -> BannerService {
        BannerService::new(self, unit)
    }

    /// Native service with the default delegate
    pub fn native(&self, unit: impl Into<AdUnit>) -> NativeService {
        NativeService::new(self, unit)
    }

    /// Add the mediation debugger entry to a host debug menu
    pub fn register_debug_entries(&self, menu: &mut dyn DebugMenu) {
        register_mediation_debugger(menu, self.provider.clone());
    }

    pub(crate) fn coordinator_context(&self) -> CoordinatorContext {
        CoordinatorContext {
            runtime: self.runtime.clone(),
            policy: RetryPolicy::from(&self.config.retry),
            metrics: self.metrics.clone(),
        }
    }
}

impl std::fmt::Debug for Mediation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediation")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
