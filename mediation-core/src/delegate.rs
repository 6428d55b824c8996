//! Caller-facing callback interfaces, one per ad format
//!
//! Coordinators forward every SDK callback to the delegate, regardless of
//! their own state. Callers that supply no delegate get an
//! [`AnalyticsDelegate`], which turns callbacks into analytics events.

use crate::analytics::{AdAnalyticsEvent, AnalyticsSink};
use crate::error::AdError;
use crate::types::{AdFormat, AdInfo, AdUnit, Reward};
use std::sync::Arc;

/// Callbacks shared by interstitial, app-open, rewarded and banner ads
pub trait AdEventDelegate: Send + Sync {
    /// Ad loaded
    fn on_load(&self, _ad: &AdInfo) {}

    /// Ad failed to load; a retry is already scheduled
    fn on_fail_to_load(&self, _unit: &AdUnit, _error: &AdError) {}

    /// Ad displayed
    fn on_display(&self, _ad: &AdInfo) {}

    /// Ad clicked
    fn on_click(&self, _ad: &AdInfo) {}

    /// Ad dismissed; a fresh load is already requested
    fn on_hide(&self, _ad: &AdInfo) {}

    /// Ad failed to display; a fresh load is already requested
    fn on_fail_to_display(&self, _ad: &AdInfo, _error: &AdError) {}

    /// Impression revenue paid
    fn on_revenue_paid(&self, _ad: &AdInfo) {}
}

/// Rewarded ad callbacks
pub trait RewardedAdDelegate: AdEventDelegate {
    /// Reward granted to the user
    fn on_reward_granted(&self, _ad: &AdInfo, _reward: &Reward) {}
}

/// Banner ad callbacks
pub trait BannerAdDelegate: AdEventDelegate {
    /// Banner expanded
    fn on_expand(&self, _ad: &AdInfo) {}

    /// Banner collapsed
    fn on_collapse(&self, _ad: &AdInfo) {}
}

/// Native ad callbacks
pub trait NativeAdDelegate: Send + Sync {
    /// Native ad loaded
    fn on_load(&self, _ad: &AdInfo) {}

    /// Native ad failed to load; a retry is already scheduled
    fn on_fail_to_load(&self, _unit: &AdUnit, _error: &AdError) {}

    /// Native ad clicked
    fn on_click(&self, _ad: &AdInfo) {}

    /// Held native ad expired
    fn on_expire(&self, _ad: &AdInfo) {}

    /// Impression revenue paid
    fn on_revenue_paid(&self, _ad: &AdInfo) {}
}

/// Default delegate: no-op on load, everything else goes to analytics
pub struct AnalyticsDelegate {
    format: AdFormat,
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsDelegate {
    /// Create new delegate for one format
    pub fn new(format: AdFormat, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { format, sink }
    }

    /// Format events are tagged with
    pub fn format(&self) -> AdFormat {
        self.format
    }

    fn track(&self, event: AdAnalyticsEvent) {
        self.sink.track(event);
    }

    fn track_revenue(&self, ad: &AdInfo) {
        match &ad.revenue {
            Some(revenue) => self.track(AdAnalyticsEvent::revenue_paid(
                self.format,
                revenue.amount,
                &revenue.currency,
            )),
            None => self.track(AdAnalyticsEvent::revenue_paid(self.format, 0.0, "")),
        }
    }
}

impl std::fmt::Debug for AnalyticsDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsDelegate")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl AdEventDelegate for AnalyticsDelegate {
    fn on_load(&self, _ad: &AdInfo) {}

    fn on_fail_to_load(&self, _unit: &AdUnit, error: &AdError) {
        self.track(AdAnalyticsEvent::LoadFailed {
            format: self.format,
            error_code: error.code,
        });
    }

    fn on_display(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Displayed {
            format: self.format,
        });
    }

    fn on_click(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Clicked {
            format: self.format,
        });
    }

    fn on_hide(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Dismissed {
            format: self.format,
        });
    }

    fn on_fail_to_display(&self, _ad: &AdInfo, error: &AdError) {
        self.track(AdAnalyticsEvent::DisplayFailed {
            format: self.format,
            error_code: error.code,
        });
    }

    fn on_revenue_paid(&self, ad: &AdInfo) {
        self.track_revenue(ad);
    }
}

impl RewardedAdDelegate for AnalyticsDelegate {
    fn on_reward_granted(&self, _ad: &AdInfo, reward: &Reward) {
        self.track(AdAnalyticsEvent::reward_granted(self.format, reward));
    }
}

impl BannerAdDelegate for AnalyticsDelegate {
    fn on_expand(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Expanded {
            format: self.format,
        });
    }

    fn on_collapse(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Collapsed {
            format: self.format,
        });
    }
}

impl NativeAdDelegate for AnalyticsDelegate {
    fn on_load(&self, _ad: &AdInfo) {}

    fn on_fail_to_load(&self, unit: &AdUnit, error: &AdError) {
        AdEventDelegate::on_fail_to_load(self, unit, error);
    }

    fn on_click(&self, ad: &AdInfo) {
        AdEventDelegate::on_click(self, ad);
    }

    fn on_expire(&self, _ad: &AdInfo) {
        self.track(AdAnalyticsEvent::Expired {
            format: self.format,
        });
    }

    fn on_revenue_paid(&self, ad: &AdInfo) {
        self.track_revenue(ad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::MemoryAnalyticsSink;
    use crate::types::AdId;

    fn delegate(format: AdFormat) -> (AnalyticsDelegate, Arc<MemoryAnalyticsSink>) {
        let sink = Arc::new(MemoryAnalyticsSink::new());
        (AnalyticsDelegate::new(format, sink.clone()), sink)
    }

    fn ad(format: AdFormat) -> AdInfo {
        AdInfo::new(AdId(3), AdUnit::new("unit"), format, "network")
    }

    #[test]
    fn test_load_success_is_not_tracked() {
        let (delegate, sink) = delegate(AdFormat::Interstitial);
        AdEventDelegate::on_load(&delegate, &ad(AdFormat::Interstitial));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_fullscreen_callbacks_are_tracked() {
        let (delegate, sink) = delegate(AdFormat::AppOpen);
        let info = ad(AdFormat::AppOpen);
        let error = AdError::new(-23, "timeout");

        AdEventDelegate::on_fail_to_load(&delegate, &info.unit, &error);
        AdEventDelegate::on_display(&delegate, &info);
        AdEventDelegate::on_click(&delegate, &info);
        AdEventDelegate::on_hide(&delegate, &info);
        AdEventDelegate::on_fail_to_display(&delegate, &info, &error);

        assert_eq!(
            sink.names(),
            vec![
                "adDidFailToLoad_appOpen_error_-23",
                "adDidDisplay_appOpen",
                "adDidClick_appOpen",
                "adDidDismiss_appOpen",
                "adDidFailToDisplay_appOpen_error_-23",
            ]
        );
    }

    #[test]
    fn test_reward_and_banner_extras() {
        let (rewarded, sink) = delegate(AdFormat::RewardedVideo);
        rewarded.on_reward_granted(&ad(AdFormat::RewardedVideo), &Reward::new(5.0, "coins"));
        assert_eq!(sink.names(), vec!["adDidRewardUser_rewardedVideo_coins_5"]);

        let (banner, sink) = delegate(AdFormat::Banner);
        banner.on_expand(&ad(AdFormat::Banner));
        banner.on_collapse(&ad(AdFormat::Banner));
        assert_eq!(sink.names(), vec!["adDidExpand_banner", "adDidCollapse_banner"]);
    }

    #[test]
    fn test_native_expire_and_revenue() {
        let (native, sink) = delegate(AdFormat::Native);
        let paid = ad(AdFormat::Native).with_revenue(0.5, "EUR");

        NativeAdDelegate::on_expire(&native, &paid);
        NativeAdDelegate::on_revenue_paid(&native, &paid);
        NativeAdDelegate::on_revenue_paid(&native, &ad(AdFormat::Native));

        assert_eq!(
            sink.names(),
            vec![
                "adExpired_native",
                "adRevenuePaid_native_EUR_0.5",
                "adRevenuePaid_native_unknown_0.0",
            ]
        );
    }
}
