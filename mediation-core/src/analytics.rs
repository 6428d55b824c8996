//! Analytics events emitted for ad lifecycle transitions
//!
//! Delegates build one [`AdAnalyticsEvent`] per SDK callback and hand it to an
//! [`AnalyticsSink`]. Sinks are fire-and-forget: they must not block and
//! their failures never reach the coordinators.

use crate::types::{AdFormat, Reward};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for empty currency codes and reward labels
pub const UNKNOWN_LABEL: &str = "unknown";

/// Broad grouping of analytics events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsEventCategory {
    /// Load success / failure
    Load,
    /// Display success / failure
    Display,
    /// Click-through
    Click,
    /// Ad dismissed
    Dismiss,
    /// Revenue paid
    Revenue,
    /// Reward granted
    Reward,
    /// Ad expired while held
    Expiry,
    /// Impression recorded
    Impression,
    /// Banner expand / collapse
    View,
}

/// One analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AdAnalyticsEvent {
    /// Ad loaded
    Loaded {
        /// Ad format
        format: AdFormat,
    },

    /// Ad failed to load
    LoadFailed {
        /// Ad format
        format: AdFormat,
        /// Provider error code
        error_code: i64,
    },

    /// Ad displayed
    Displayed {
        /// Ad format
        format: AdFormat,
    },

    /// Ad failed to display
    DisplayFailed {
        /// Ad format
        format: AdFormat,
        /// Provider error code
        error_code: i64,
    },

    /// Ad clicked
    Clicked {
        /// Ad format
        format: AdFormat,
    },

    /// Ad dismissed by the user
    Dismissed {
        /// Ad format
        format: AdFormat,
    },

    /// Impression revenue paid
    RevenuePaid {
        /// Ad format
        format: AdFormat,
        /// Revenue amount
        revenue: f64,
        /// Currency code
        currency: String,
    },

    /// Reward granted to the user
    RewardGranted {
        /// Ad format
        format: AdFormat,
        /// Reward amount
        amount: i64,
        /// Reward type label
        reward_type: String,
    },

    /// Held ad expired
    Expired {
        /// Ad format
        format: AdFormat,
    },

    /// Impression tracked
    ImpressionTracked {
        /// Ad format
        format: AdFormat,
    },

    /// Banner expanded
    Expanded {
        /// Ad format
        format: AdFormat,
    },

    /// Banner collapsed
    Collapsed {
        /// Ad format
        format: AdFormat,
    },
}

impl AdAnalyticsEvent {
    /// Revenue event with non-finite amounts and empty currencies sanitized
    pub fn revenue_paid(format: AdFormat, revenue: f64, currency: &str) -> Self {
        let revenue = if revenue.is_finite() { revenue } else { 0.0 };
        AdAnalyticsEvent::RevenuePaid {
            format,
            revenue,
            currency: non_empty(currency),
        }
    }

    /// Reward event with the SDK amount truncated to an integer
    pub fn reward_granted(format: AdFormat, reward: &Reward) -> Self {
        AdAnalyticsEvent::RewardGranted {
            format,
            amount: reward_amount(reward.amount),
            reward_type: non_empty(&reward.label),
        }
    }

    /// Format tag
    pub fn format(&self) -> AdFormat {
        match self {
            AdAnalyticsEvent::Loaded { format }
            | AdAnalyticsEvent::LoadFailed { format, .. }
            | AdAnalyticsEvent::Displayed { format }
            | AdAnalyticsEvent::DisplayFailed { format, .. }
            | AdAnalyticsEvent::Clicked { format }
            | AdAnalyticsEvent::Dismissed { format }
            | AdAnalyticsEvent::RevenuePaid { format, .. }
            | AdAnalyticsEvent::RewardGranted { format, .. }
            | AdAnalyticsEvent::Expired { format }
            | AdAnalyticsEvent::ImpressionTracked { format }
            | AdAnalyticsEvent::Expanded { format }
            | AdAnalyticsEvent::Collapsed { format } => *format,
        }
    }

    /// Event category
    pub fn category(&self) -> AnalyticsEventCategory {
        match self {
            AdAnalyticsEvent::Loaded { .. } | AdAnalyticsEvent::LoadFailed { .. } => {
                AnalyticsEventCategory::Load
            }
            AdAnalyticsEvent::Displayed { .. } | AdAnalyticsEvent::DisplayFailed { .. } => {
                AnalyticsEventCategory::Display
            }
            AdAnalyticsEvent::Clicked { .. } => AnalyticsEventCategory::Click,
            AdAnalyticsEvent::Dismissed { .. } => AnalyticsEventCategory::Dismiss,
            AdAnalyticsEvent::RevenuePaid { .. } => AnalyticsEventCategory::Revenue,
            AdAnalyticsEvent::RewardGranted { .. } => AnalyticsEventCategory::Reward,
            AdAnalyticsEvent::Expired { .. } => AnalyticsEventCategory::Expiry,
            AdAnalyticsEvent::ImpressionTracked { .. } => AnalyticsEventCategory::Impression,
            AdAnalyticsEvent::Expanded { .. } | AdAnalyticsEvent::Collapsed { .. } => {
                AnalyticsEventCategory::View
            }
        }
    }

    /// Flat event name recorded by the analytics backend
    pub fn name(&self) -> String {
        match self {
            AdAnalyticsEvent::Loaded { format } => format!("adDidLoad_{}", format),
            AdAnalyticsEvent::LoadFailed { format, error_code } => {
                format!("adDidFailToLoad_{}_error_{}", format, error_code)
            }
            AdAnalyticsEvent::Displayed { format } => format!("adDidDisplay_{}", format),
            AdAnalyticsEvent::DisplayFailed { format, error_code } => {
                format!("adDidFailToDisplay_{}_error_{}", format, error_code)
            }
            AdAnalyticsEvent::Clicked { format } => format!("adDidClick_{}", format),
            AdAnalyticsEvent::Dismissed { format } => format!("adDidDismiss_{}", format),
            AdAnalyticsEvent::RevenuePaid {
                format,
                revenue,
                currency,
            } => format!("adRevenuePaid_{}_{}_{:?}", format, currency, revenue),
            AdAnalyticsEvent::RewardGranted {
                format,
                amount,
                reward_type,
            } => format!("adDidRewardUser_{}_{}_{}", format, reward_type, amount),
            AdAnalyticsEvent::Expired { format } => format!("adExpired_{}", format),
            AdAnalyticsEvent::ImpressionTracked { format } => {
                format!("adImpressionTracked_{}", format)
            }
            AdAnalyticsEvent::Expanded { format } => format!("adDidExpand_{}", format),
            AdAnalyticsEvent::Collapsed { format } => format!("adDidCollapse_{}", format),
        }
    }
}

impl fmt::Display for AdAnalyticsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn non_empty(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

fn reward_amount(amount: f64) -> i64 {
    if !amount.is_finite() {
        return 0;
    }
    // `as` saturates at the i64 bounds
    amount.trunc() as i64
}

/// Receiver of analytics events
pub trait AnalyticsSink: Send + Sync {
    /// Record one event
    fn track(&self, event: AdAnalyticsEvent);
}

/// Sink that writes events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalyticsSink;

impl AnalyticsSink for TracingAnalyticsSink {
    fn track(&self, event: AdAnalyticsEvent) {
        tracing::info!(
            event = %event.name(),
            category = ?event.category(),
            format = %event.format(),
            "Ad analytics event"
        );
    }
}

/// Event captured by [`MemoryAnalyticsSink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    /// Wall-clock time the event was tracked
    pub tracked_at: DateTime<Utc>,

    /// The event
    pub event: AdAnalyticsEvent,
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryAnalyticsSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryAnalyticsSink {
    /// Create new empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events tracked so far, oldest first
    pub fn events(&self) -> Vec<AdAnalyticsEvent> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// Event names tracked so far, oldest first
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|r| r.event.name()).collect()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Serialize recorded events as JSON lines
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let events = self.events.lock();
        let mut out = String::new();
        for recorded in events.iter() {
            out.push_str(&serde_json::to_string(recorded)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl AnalyticsSink for MemoryAnalyticsSink {
    fn track(&self, event: AdAnalyticsEvent) {
        self.events.lock().push(RecordedEvent {
            tracked_at: Utc::now(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let fail = AdAnalyticsEvent::LoadFailed {
            format: AdFormat::Interstitial,
            error_code: -5001,
        };
        assert_eq!(fail.name(), "adDidFailToLoad_interstitial_error_-5001");
        assert_eq!(fail.category(), AnalyticsEventCategory::Load);

        let dismiss = AdAnalyticsEvent::Dismissed {
            format: AdFormat::AppOpen,
        };
        assert_eq!(dismiss.name(), "adDidDismiss_appOpen");

        let expand = AdAnalyticsEvent::Expanded {
            format: AdFormat::Banner,
        };
        assert_eq!(expand.name(), "adDidExpand_banner");
        assert_eq!(expand.category(), AnalyticsEventCategory::View);
    }

    #[test]
    fn test_revenue_event_name() {
        let event = AdAnalyticsEvent::revenue_paid(AdFormat::Native, 0.0125, "USD");
        assert_eq!(event.name(), "adRevenuePaid_native_USD_0.0125");
        assert_eq!(event.category(), AnalyticsEventCategory::Revenue);
    }

    #[test]
    fn test_malformed_revenue_is_sanitized() {
        let event = AdAnalyticsEvent::revenue_paid(AdFormat::Native, f64::NAN, "  ");
        assert_eq!(
            event,
            AdAnalyticsEvent::RevenuePaid {
                format: AdFormat::Native,
                revenue: 0.0,
                currency: UNKNOWN_LABEL.to_string(),
            }
        );
    }

    #[test]
    fn test_reward_amount_truncates_and_saturates() {
        let coins = Reward::new(12.9, "coins");
        assert_eq!(
            AdAnalyticsEvent::reward_granted(AdFormat::RewardedVideo, &coins).name(),
            "adDidRewardUser_rewardedVideo_coins_12"
        );

        let huge = Reward::new(1e300, "gems");
        match AdAnalyticsEvent::reward_granted(AdFormat::RewardedVideo, &huge) {
            AdAnalyticsEvent::RewardGranted { amount, .. } => assert_eq!(amount, i64::MAX),
            other => panic!("unexpected event: {other:?}"),
        }

        let broken = Reward::new(f64::INFINITY, "");
        match AdAnalyticsEvent::reward_granted(AdFormat::RewardedVideo, &broken) {
            AdAnalyticsEvent::RewardGranted {
                amount,
                reward_type,
                ..
            } => {
                assert_eq!(amount, 0);
                assert_eq!(reward_type, UNKNOWN_LABEL);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemoryAnalyticsSink::new();
        sink.track(AdAnalyticsEvent::Displayed {
            format: AdFormat::Interstitial,
        });
        sink.track(AdAnalyticsEvent::Dismissed {
            format: AdFormat::Interstitial,
        });

        assert_eq!(
            sink.names(),
            vec!["adDidDisplay_interstitial", "adDidDismiss_interstitial"]
        );

        let json = sink.to_json_lines().unwrap();
        assert_eq!(json.lines().count(), 2);
        assert!(json.contains("\"event\":\"displayed\""));

        assert_eq!(sink.take().len(), 2);
        assert!(sink.events().is_empty());
    }
}
