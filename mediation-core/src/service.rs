//! Caller-facing ad services
//!
//! An [`AdService`] owns exactly one coordinator for its lifetime. Creating
//! the service spawns the coordinator, wires the availability bridge and
//! requests the first load. Dropping the service tears the coordinator down;
//! SDK callbacks or retry timers that arrive afterwards are ignored.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use mediation_core::{Mediation, MediationConfig, ShowOutcome, testing::RecordingProvider};
//! # async fn demo() -> mediation_core::Result<()> {
//! let mediation = Mediation::new(Arc::new(RecordingProvider::new()), MediationConfig::default())?;
//! let interstitial = mediation.interstitial("home-interstitial");
//!
//! if interstitial.show_ad_if_available() == ShowOutcome::Unavailable {
//!     // nothing loaded yet; the service keeps retrying in the background
//! }
//! # Ok(())
//! # }
//! ```

use crate::analytics::AnalyticsSink;
use crate::bridge::{spawn_bridge, AvailabilityProperty, AvailabilityStream};
use crate::coordinator::banner::BannerDriver;
use crate::coordinator::fullscreen::FullscreenDriver;
use crate::coordinator::native::NativeDriver;
use crate::coordinator::rewarded::RewardedDriver;
use crate::coordinator::{spawn_coordinator, CoordinatorHandle, CoordinatorSnapshot};
use crate::delegate::{
    AdEventDelegate, AnalyticsDelegate, BannerAdDelegate, NativeAdDelegate, RewardedAdDelegate,
};
use crate::mediation::Mediation;
use crate::types::{AdFormat, AdUnit};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Result of [`AdService::show_ad_if_available`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowOutcome {
    /// Show forwarded to the coordinator
    Requested,

    /// No ad available; nothing happened
    Unavailable,
}

mod sealed {
    pub trait Sealed {}
}

/// Ad format marker
///
/// Implemented by [`Interstitial`], [`Rewarded`], [`AppOpen`], [`Banner`]
/// and [`Native`]; selects the SDK object, delegate surface and driver.
pub trait FormatKind: sealed::Sealed + Send + Sync + 'static {
    /// Format handled
    const FORMAT: AdFormat;

    /// Delegate surface for this format
    type Delegate: ?Sized + Send + Sync + 'static;

    /// Analytics-backed delegate used when the caller supplies none
    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate>;

    /// Spawn the coordinator for `unit`
    #[doc(hidden)]
    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream);
}

/// Interstitial format
#[derive(Debug)]
pub enum Interstitial {}

/// Rewarded video format
#[derive(Debug)]
pub enum Rewarded {}

/// App-open format
#[derive(Debug)]
pub enum AppOpen {}

/// Banner format
#[derive(Debug)]
pub enum Banner {}

/// Native format
#[derive(Debug)]
pub enum Native {}

impl sealed::Sealed for Interstitial {}
impl sealed::Sealed for Rewarded {}
impl sealed::Sealed for AppOpen {}
impl sealed::Sealed for Banner {}
impl sealed::Sealed for Native {}

impl FormatKind for Interstitial {
    const FORMAT: AdFormat = AdFormat::Interstitial;
    type Delegate = dyn AdEventDelegate;

    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate> {
        Arc::new(AnalyticsDelegate::new(Self::FORMAT, sink))
    }

    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream) {
        let provider = mediation.provider().clone();
        spawn_coordinator(&mediation.coordinator_context(), Self::FORMAT, unit, |sink| {
            FullscreenDriver::new(provider.interstitial(unit, sink), delegate)
        })
    }
}

impl FormatKind for AppOpen {
    const FORMAT: AdFormat = AdFormat::AppOpen;
    type Delegate = dyn AdEventDelegate;

    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate> {
        Arc::new(AnalyticsDelegate::new(Self::FORMAT, sink))
    }

    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream) {
        let provider = mediation.provider().clone();
        spawn_coordinator(&mediation.coordinator_context(), Self::FORMAT, unit, |sink| {
            FullscreenDriver::new(provider.app_open(unit, sink), delegate)
        })
    }
}

impl FormatKind for Rewarded {
    const FORMAT: AdFormat = AdFormat::RewardedVideo;
    type Delegate = dyn RewardedAdDelegate;

    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate> {
        Arc::new(AnalyticsDelegate::new(Self::FORMAT, sink))
    }

    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream) {
        let provider = mediation.provider().clone();
        spawn_coordinator(&mediation.coordinator_context(), Self::FORMAT, unit, |sink| {
            RewardedDriver::new(provider.rewarded(unit, sink), delegate)
        })
    }
}

impl FormatKind for Banner {
    const FORMAT: AdFormat = AdFormat::Banner;
    type Delegate = dyn BannerAdDelegate;

    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate> {
        Arc::new(AnalyticsDelegate::new(Self::FORMAT, sink))
    }

    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream) {
        let provider = mediation.provider().clone();
        spawn_coordinator(&mediation.coordinator_context(), Self::FORMAT, unit, |sink| {
            BannerDriver::new(provider.banner(unit, sink), delegate)
        })
    }
}

impl FormatKind for Native {
    const FORMAT: AdFormat = AdFormat::Native;
    type Delegate = dyn NativeAdDelegate;

    fn default_delegate(sink: Arc<dyn AnalyticsSink>) -> Arc<Self::Delegate> {
        Arc::new(AnalyticsDelegate::new(Self::FORMAT, sink))
    }

    fn spawn(
        mediation: &Mediation,
        unit: &AdUnit,
        delegate: Arc<Self::Delegate>,
    ) -> (CoordinatorHandle, AvailabilityStream) {
        let provider = mediation.provider().clone();
        spawn_coordinator(&mediation.coordinator_context(), Self::FORMAT, unit, |sink| {
            NativeDriver::new(provider.native_loader(unit, sink), delegate)
        })
    }
}

/// Interstitial service
pub type InterstitialService = AdService<Interstitial>;

/// Rewarded video service
pub type RewardedService = AdService<Rewarded>;

/// App-open service
pub type AppOpenService = AdService<AppOpen>;

/// Banner service
pub type BannerService = AdService<Banner>;

/// Native service
pub type NativeService = AdService<Native>;

/// Facade over one coordinator
pub struct AdService<K: FormatKind> {
    unit: AdUnit,
    coordinator: CoordinatorHandle,
    availability: AvailabilityProperty,
    bridge: JoinHandle<()>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: FormatKind> AdService<K> {
    /// Create new service reporting to the context's analytics sink
    pub fn new(mediation: &Mediation, unit: impl Into<AdUnit>) -> Self {
        let delegate = K::default_delegate(mediation.analytics());
        Self::with_delegate(mediation, unit, delegate)
    }

    /// Create new service with a caller-supplied delegate
    pub fn with_delegate(
        mediation: &Mediation,
        unit: impl Into<AdUnit>,
        delegate: Arc<K::Delegate>,
    ) -> Self {
        let unit = unit.into();
        let (coordinator, stream) = K::spawn(mediation, &unit, delegate);

        let availability = AvailabilityProperty::new(mediation.config().availability_feed_capacity);
        let bridge = spawn_bridge(mediation.runtime(), stream, availability.clone());

        tracing::info!(format = %K::FORMAT, ad_unit = %unit, id = %coordinator.id(), "Initialized with ad unit");

        let service = Self {
            unit,
            coordinator,
            availability,
            bridge,
            _kind: PhantomData,
        };
        service.load_ad();
        service
    }

    /// Format served
    pub fn format(&self) -> AdFormat {
        K::FORMAT
    }

    /// Ad unit served
    pub fn ad_unit(&self) -> &AdUnit {
        &self.unit
    }

    /// Request a load
    pub fn load_ad(&self) {
        tracing::info!(format = %K::FORMAT, ad_unit = %self.unit, "Loading ad");
        if let Err(e) = self.coordinator.load() {
            tracing::warn!(format = %K::FORMAT, error = %e, "Load request dropped");
        }
    }

    /// Show the ad if the mirrored availability says one is loaded
    pub fn show_ad_if_available(&self) -> ShowOutcome {
        if !self.is_ad_available() {
            tracing::info!(format = %K::FORMAT, ad_unit = %self.unit, "No ad available to show");
            return ShowOutcome::Unavailable;
        }

        tracing::info!(format = %K::FORMAT, ad_unit = %self.unit, "Showing ad");
        match self.coordinator.show() {
            Ok(()) => ShowOutcome::Requested,
            Err(e) => {
                tracing::warn!(format = %K::FORMAT, error = %e, "Show request dropped");
                ShowOutcome::Unavailable
            }
        }
    }

    /// Latest availability mirrored from the coordinator
    pub fn is_ad_available(&self) -> bool {
        self.availability.get()
    }

    /// Receiver tracking the latest availability
    pub fn watch_availability(&self) -> watch::Receiver<bool> {
        self.availability.watch()
    }

    /// Ordered feed of every availability write from now on
    ///
    /// The feed buffers `availability_feed_capacity` values per receiver.
    /// A receiver that falls further behind gets
    /// [`broadcast::error::RecvError::Lagged`] and loses the oldest writes;
    /// use [`AdService::watch_availability`] when only the latest value
    /// matters.
    pub fn subscribe_availability(&self) -> broadcast::Receiver<bool> {
        self.availability.subscribe()
    }

    /// Coordinator state, read through its mailbox
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot> {
        self.coordinator.snapshot().await
    }

    /// Tear down and wait for the coordinator and bridge to finish
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            unit,
            coordinator,
            bridge,
            ..
        } = self;

        coordinator.shutdown().await?;
        if let Err(e) = bridge.await {
            tracing::warn!(format = %K::FORMAT, error = %e, "Availability bridge ended abnormally");
        }

        tracing::info!(format = %K::FORMAT, ad_unit = %unit, "Service shut down");
        Ok(())
    }
}

impl<K: FormatKind> std::fmt::Debug for AdService<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdService")
            .field("format", &K::FORMAT)
            .field("unit", &self.unit)
            .field("available", &self.is_ad_available())
            .finish_non_exhaustive()
    }
}
