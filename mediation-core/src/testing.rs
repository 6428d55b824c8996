//! In-process ad provider and delegate for tests and simulations
//!
//! [`RecordingProvider`] records every SDK call the coordinators make and
//! lets a test drive callbacks by hand, or answer loads automatically with
//! a [`LoadBehavior`].

use crate::delegate::{AdEventDelegate, BannerAdDelegate, NativeAdDelegate, RewardedAdDelegate};
use crate::error::AdError;
use crate::sdk::{AdEvent, AdEventSink, AdProvider, BannerAd, FullscreenAd, NativeAdLoader};
use crate::types::{AdFormat, AdId, AdInfo, AdUnit, Reward};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

/// Network name stamped on ads created by [`RecordingProvider`]
pub const RECORDING_NETWORK: &str = "recording";

/// SDK call made by a coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    /// Load requested
    Load,

    /// Full-screen or banner show
    Show,

    /// Native ad rendered
    Render(AdId),

    /// Native ad destroyed
    Destroy(AdId),
}

/// SDK call with where and when it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Format of the calling coordinator
    pub format: AdFormat,

    /// Ad unit of the calling coordinator
    pub unit: AdUnit,

    /// The call
    pub call: SdkCall,

    /// Tokio clock time of the call
    pub at: Instant,
}

/// How the provider answers a load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadBehavior {
    /// No automatic answer; the test emits callbacks itself
    #[default]
    Manual,

    /// Every load fails with this error code
    Fail(i64),

    /// Every load succeeds with a fresh ad
    Succeed,
}

#[derive(Default)]
struct ProviderState {
    calls: Vec<RecordedCall>,
    sinks: HashMap<(AdFormat, AdUnit), AdEventSink>,
    behaviors: HashMap<AdUnit, LoadBehavior>,
    next_ad_id: u64,
    debugger_opened: usize,
}

/// Ad provider that records calls
#[derive(Clone, Default)]
pub struct RecordingProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl RecordingProvider {
    /// Create new provider; every unit starts as [`LoadBehavior::Manual`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how loads for `unit` are answered
    pub fn set_behavior(&self, unit: impl Into<AdUnit>, behavior: LoadBehavior) {
        self.state.lock().behaviors.insert(unit.into(), behavior);
    }

    /// Allocate a fresh ad for `unit`
    pub fn next_ad(&self, format: AdFormat, unit: impl Into<AdUnit>) -> AdInfo {
        let mut state = self.state.lock();
        state.next_ad_id += 1;
        AdInfo::new(AdId(state.next_ad_id), unit.into(), format, RECORDING_NETWORK)
    }

    /// Deliver a callback as the SDK would; false if no live coordinator
    pub fn emit(&self, format: AdFormat, unit: impl Into<AdUnit>, event: AdEvent) -> bool {
        let sink = self
            .state
            .lock()
            .sinks
            .get(&(format, unit.into()))
            .cloned();

        match sink {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// Deliver a load success with a fresh ad and return it
    pub fn emit_loaded(&self, format: AdFormat, unit: impl Into<AdUnit>) -> AdInfo {
        let unit = unit.into();
        let ad = self.next_ad(format, unit.clone());
        self.emit(format, unit, AdEvent::Loaded(ad.clone()));
        ad
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls made by coordinators of one format
    pub fn calls_for(&self, format: AdFormat) -> Vec<SdkCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.format == format)
            .map(|c| c.call.clone())
            .collect()
    }

    /// Clock times of every load for one format
    pub fn load_times(&self, format: AdFormat) -> Vec<Instant> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.format == format && c.call == SdkCall::Load)
            .map(|c| c.at)
            .collect()
    }

    /// Number of loads for one format
    pub fn loads(&self, format: AdFormat) -> usize {
        self.load_times(format).len()
    }

    /// Number of shows for one format
    pub fn shows(&self, format: AdFormat) -> usize {
        self.calls_for(format)
            .iter()
            .filter(|c| **c == SdkCall::Show)
            .count()
    }

    /// Native ads destroyed, in order
    pub fn destroyed(&self) -> Vec<AdId> {
        self.calls_for(AdFormat::Native)
            .into_iter()
            .filter_map(|c| match c {
                SdkCall::Destroy(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Native ads rendered, in order
    pub fn rendered(&self) -> Vec<AdId> {
        self.calls_for(AdFormat::Native)
            .into_iter()
            .filter_map(|c| match c {
                SdkCall::Render(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Times the mediation debugger was opened
    pub fn debugger_opened(&self) -> usize {
        self.state.lock().debugger_opened
    }

    fn object(&self, format: AdFormat, unit: &AdUnit, sink: AdEventSink) -> RecordingAd {
        self.state
            .lock()
            .sinks
            .insert((format, unit.clone()), sink.clone());

        RecordingAd {
            format,
            unit: unit.clone(),
            sink,
            state: self.state.clone(),
        }
    }
}

impl std::fmt::Debug for RecordingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingProvider")
            .field("calls", &self.state.lock().calls.len())
            .finish_non_exhaustive()
    }
}

impl AdProvider for RecordingProvider {
    fn interstitial(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.object(AdFormat::Interstitial, unit, sink))
    }

    fn rewarded(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.object(AdFormat::RewardedVideo, unit, sink))
    }

    fn app_open(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.object(AdFormat::AppOpen, unit, sink))
    }

    fn banner(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn BannerAd> {
        Box::new(self.object(AdFormat::Banner, unit, sink))
    }

    fn native_loader(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn NativeAdLoader> {
        Box::new(self.object(AdFormat::Native, unit, sink))
    }

    fn show_mediation_debugger(&self) {
        self.state.lock().debugger_opened += 1;
    }
}

/// SDK object handed out by [`RecordingProvider`]
struct RecordingAd {
    format: AdFormat,
    unit: AdUnit,
    sink: AdEventSink,
    state: Arc<Mutex<ProviderState>>,
}

impl RecordingAd {
    fn record(&self, call: SdkCall) {
        self.state.lock().calls.push(RecordedCall {
            format: self.format,
            unit: self.unit.clone(),
            call,
            at: Instant::now(),
        });
    }

    fn answer_load(&mut self) {
        self.record(SdkCall::Load);

        let answer = {
            let mut state = self.state.lock();
            let behavior = state.behaviors.get(&self.unit).cloned().unwrap_or_default();
            match behavior {
                LoadBehavior::Manual => None,
                LoadBehavior::Fail(code) => Some(AdEvent::LoadFailed {
                    unit: self.unit.clone(),
                    error: AdError::new(code, "no fill"),
                }),
                LoadBehavior::Succeed => {
                    state.next_ad_id += 1;
                    Some(AdEvent::Loaded(AdInfo::new(
                        AdId(state.next_ad_id),
                        self.unit.clone(),
                        self.format,
                        RECORDING_NETWORK,
                    )))
                }
            }
        };

        if let Some(event) = answer {
            self.sink.emit(event);
        }
    }
}

impl FullscreenAd for RecordingAd {
    fn load(&mut self) {
        self.answer_load();
    }

    fn show(&mut self) {
        self.record(SdkCall::Show);
    }
}

impl BannerAd for RecordingAd {
    fn load(&mut self) {
        self.answer_load();
    }

    fn show(&mut self) {
        self.record(SdkCall::Show);
    }
}

impl NativeAdLoader for RecordingAd {
    fn load(&mut self) {
        self.answer_load();
    }

    fn render(&mut self, ad: &AdInfo) {
        self.record(SdkCall::Render(ad.id));
    }

    fn destroy(&mut self, ad: AdInfo) {
        self.record(SdkCall::Destroy(ad.id));
    }
}

/// Delegate that records callback names
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    callbacks: Mutex<Vec<String>>,
}

impl RecordingDelegate {
    /// Create new empty delegate
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks received so far, oldest first
    pub fn callbacks(&self) -> Vec<String> {
        self.callbacks.lock().clone()
    }

    fn push(&self, callback: String) {
        self.callbacks.lock().push(callback);
    }
}

impl AdEventDelegate for RecordingDelegate {
    fn on_load(&self, ad: &AdInfo) {
        self.push(format!("load:{}", ad.id));
    }

    fn on_fail_to_load(&self, _unit: &AdUnit, error: &AdError) {
        self.push(format!("fail_to_load:{}", error.code));
    }

    fn on_display(&self, ad: &AdInfo) {
        self.push(format!("display:{}", ad.id));
    }

    fn on_click(&self, ad: &AdInfo) {
        self.push(format!("click:{}", ad.id));
    }

    fn on_hide(&self, ad: &AdInfo) {
        self.push(format!("hide:{}", ad.id));
    }

    fn on_fail_to_display(&self, _ad: &AdInfo, error: &AdError) {
        self.push(format!("fail_to_display:{}", error.code));
    }

    fn on_revenue_paid(&self, ad: &AdInfo) {
        self.push(format!("revenue:{}", ad.id));
    }
}

impl RewardedAdDelegate for RecordingDelegate {
    fn on_reward_granted(&self, _ad: &AdInfo, reward: &Reward) {
        self.push(format!("reward:{}:{}", reward.label, reward.amount));
    }
}

impl BannerAdDelegate for RecordingDelegate {
    fn on_expand(&self, ad: &AdInfo) {
        self.push(format!("expand:{}", ad.id));
    }

    fn on_collapse(&self, ad: &AdInfo) {
        self.push(format!("collapse:{}", ad.id));
    }
}

impl NativeAdDelegate for RecordingDelegate {
    fn on_load(&self, ad: &AdInfo) {
        AdEventDelegate::on_load(self, ad);
    }

    fn on_fail_to_load(&self, unit: &AdUnit, error: &AdError) {
        AdEventDelegate::on_fail_to_load(self, unit, error);
    }

    fn on_click(&self, ad: &AdInfo) {
        AdEventDelegate::on_click(self, ad);
    }

    fn on_expire(&self, ad: &AdInfo) {
        self.push(format!("expire:{}", ad.id));
    }

    fn on_revenue_paid(&self, ad: &AdInfo) {
        AdEventDelegate::on_revenue_paid(self, ad);
    }
}
