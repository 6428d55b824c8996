//! Boundary to the third-party mediation SDK
//!
//! The SDK is consumed as an opaque capability: an [`AdProvider`] builds one
//! ad object per coordinator and reports lifecycle callbacks through the
//! [`AdEventSink`] it was handed. Callbacks may be emitted from any thread;
//! emitting only enqueues the event on the owning coordinator's mailbox.

use crate::coordinator::CoordinatorMessage;
use crate::error::AdError;
use crate::metrics::Metrics;
use crate::types::{AdFormat, AdInfo, AdUnit, Reward};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Callback delivered by the SDK
#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    /// Ad loaded
    Loaded(AdInfo),

    /// Load failed
    LoadFailed {
        /// Placement that failed
        unit: AdUnit,
        /// Provider error
        error: AdError,
    },

    /// Ad displayed
    Displayed(AdInfo),

    /// Ad clicked
    Clicked(AdInfo),

    /// Ad dismissed after display
    Hidden(AdInfo),

    /// Ad failed to display
    DisplayFailed {
        /// Ad that failed
        ad: AdInfo,
        /// Provider error
        error: AdError,
    },

    /// Held ad expired (native)
    Expired(AdInfo),

    /// Impression revenue paid
    RevenuePaid(AdInfo),

    /// Reward granted (rewarded)
    RewardGranted {
        /// Rewarded ad
        ad: AdInfo,
        /// Reward payload
        reward: Reward,
    },

    /// Banner expanded
    Expanded(AdInfo),

    /// Banner collapsed
    Collapsed(AdInfo),
}

impl AdEvent {
    /// Short callback name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            AdEvent::Loaded(_) => "loaded",
            AdEvent::LoadFailed { .. } => "load_failed",
            AdEvent::Displayed(_) => "displayed",
            AdEvent::Clicked(_) => "clicked",
            AdEvent::Hidden(_) => "hidden",
            AdEvent::DisplayFailed { .. } => "display_failed",
            AdEvent::Expired(_) => "expired",
            AdEvent::RevenuePaid(_) => "revenue_paid",
            AdEvent::RewardGranted { .. } => "reward_granted",
            AdEvent::Expanded(_) => "expanded",
            AdEvent::Collapsed(_) => "collapsed",
        }
    }
}

/// Callback sink handed to SDK ad objects
///
/// Holds only a weak reference to the coordinator: callbacks emitted after
/// teardown are dropped.
#[derive(Clone)]
pub struct AdEventSink {
    format: AdFormat,
    mailbox: mpsc::WeakUnboundedSender<CoordinatorMessage>,
    metrics: Arc<Metrics>,
}

impl AdEventSink {
    pub(crate) fn new(
        format: AdFormat,
        mailbox: mpsc::WeakUnboundedSender<CoordinatorMessage>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            format,
            mailbox,
            metrics,
        }
    }

    /// Format of the coordinator behind this sink
    pub fn format(&self) -> AdFormat {
        self.format
    }

    /// Deliver one callback; returns false if the coordinator is gone
    pub fn emit(&self, event: AdEvent) -> bool {
        let kind = event.kind();
        let delivered = match self.mailbox.upgrade() {
            Some(mailbox) => mailbox.send(CoordinatorMessage::Sdk(event)).is_ok(),
            None => false,
        };

        if !delivered {
            tracing::debug!(format = %self.format, callback = kind, "Dropping callback after teardown");
            self.metrics.record_stale_callback(self.format);
        }

        delivered
    }
}

impl std::fmt::Debug for AdEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdEventSink")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Full-screen ad object (interstitial, rewarded, app-open)
pub trait FullscreenAd: Send {
    /// Request a load
    fn load(&mut self);

    /// Present the loaded ad
    fn show(&mut self);
}

/// Banner ad view
pub trait BannerAd: Send {
    /// Request a load
    fn load(&mut self);

    /// Reveal the loaded banner
    fn show(&mut self);
}

/// Native ad loader
///
/// Every successful load yields a new ad, which stays alive until passed
/// to [`NativeAdLoader::destroy`].
pub trait NativeAdLoader: Send {
    /// Request a load
    fn load(&mut self);

    /// Render a held ad into its host view
    fn render(&mut self, ad: &AdInfo);

    /// Release a loaded ad and its assets
    fn destroy(&mut self, ad: AdInfo);
}

/// Factory for SDK ad objects
pub trait AdProvider: Send + Sync {
    /// Create an interstitial bound to `unit`
    fn interstitial(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd>;

    /// Create a rewarded ad bound to `unit`
    fn rewarded(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd>;

    /// Create an app-open ad bound to `unit`
    fn app_open(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd>;

    /// Create a banner view bound to `unit`
    fn banner(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn BannerAd>;

    /// Create a native loader bound to `unit`
    fn native_loader(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn NativeAdLoader>;

    /// Open the SDK's mediation debugger
    fn show_mediation_debugger(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdId;

    fn sample_ad() -> AdInfo {
        AdInfo::new(AdId(1), AdUnit::new("unit"), AdFormat::Interstitial, "network")
    }

    #[test]
    fn test_sink_delivers_while_coordinator_alive() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = AdEventSink::new(AdFormat::Interstitial, tx.downgrade(), metrics.clone());

        assert!(sink.emit(AdEvent::Clicked(sample_ad())));
        match rx.try_recv().unwrap() {
            CoordinatorMessage::Sdk(AdEvent::Clicked(ad)) => assert_eq!(ad.id, AdId(1)),
            _ => panic!("unexpected message"),
        }
        assert_eq!(metrics.stale_callbacks(AdFormat::Interstitial), 0);
        drop(tx);
    }

    #[test]
    fn test_sink_drops_after_teardown() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = AdEventSink::new(AdFormat::Interstitial, tx.downgrade(), metrics.clone());
        drop(tx);
        drop(rx);

        assert!(!sink.emit(AdEvent::Hidden(sample_ad())));
        assert_eq!(metrics.stale_callbacks(AdFormat::Interstitial), 1);
    }
}
