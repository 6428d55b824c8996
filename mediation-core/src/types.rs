//! Core types shared by coordinators, services and delegates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ad placement identifier registered with the mediation SDK
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdUnit(String);

impl AdUnit {
    /// Create new ad unit
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AdUnit {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Ad format served by a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdFormat {
    /// Inline banner view
    Banner,
    /// Full-screen interstitial
    Interstitial,
    /// Full-screen rewarded video
    RewardedVideo,
    /// Native ad rendered into host views
    Native,
    /// Full-screen ad shown on app foreground
    AppOpen,
}

impl AdFormat {
    /// All formats
    pub const ALL: [AdFormat; 5] = [
        AdFormat::Banner,
        AdFormat::Interstitial,
        AdFormat::RewardedVideo,
        AdFormat::Native,
        AdFormat::AppOpen,
    ];

    /// Stable name used in analytics and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            AdFormat::Banner => "banner",
            AdFormat::Interstitial => "interstitial",
            AdFormat::RewardedVideo => "rewardedVideo",
            AdFormat::Native => "native",
            AdFormat::AppOpen => "appOpen",
        }
    }
}

impl fmt::Display for AdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK-assigned identity of one loaded ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdId(pub u64);

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ad-{}", self.0)
    }
}

/// Revenue attributed to an ad impression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    /// Amount, as reported by the SDK (may be malformed)
    pub amount: f64,

    /// ISO 4217 currency code
    pub currency: String,
}

/// Reward payload granted by a rewarded ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// Amount, as reported by the SDK (may be malformed)
    pub amount: f64,

    /// Reward label ("coins", "lives", ...)
    pub label: String,
}

impl Reward {
    /// Create new reward
    pub fn new(amount: f64, label: impl Into<String>) -> Self {
        Self {
            amount,
            label: label.into(),
        }
    }
}

/// Description of a loaded ad handed over by the SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdInfo {
    /// Ad identity
    pub id: AdId,

    /// Placement the ad was loaded for
    pub unit: AdUnit,

    /// Ad format
    pub format: AdFormat,

    /// Winning network name
    pub network_name: String,

    /// Impression revenue, when known
    pub revenue: Option<Revenue>,
}

impl AdInfo {
    /// Create new ad info without revenue
    pub fn new(id: AdId, unit: AdUnit, format: AdFormat, network_name: impl Into<String>) -> Self {
        Self {
            id,
            unit,
            format,
            network_name: network_name.into(),
            revenue: None,
        }
    }

    /// Attach revenue
    pub fn with_revenue(mut self, amount: f64, currency: impl Into<String>) -> Self {
        self.revenue = Some(Revenue {
            amount,
            currency: currency.into(),
        });
        self
    }
}

/// Lifecycle state of a coordinator
///
/// `Available` is the only state in which an ad may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdState {
    /// Nothing loaded, no request outstanding
    Idle,
    /// Load requested, waiting for the SDK
    Loading,
    /// Ad loaded and ready to show
    Available,
    /// Ad on screen (consumed)
    Displaying,
}

impl AdState {
    /// Whether an ad can be shown in this state
    pub fn is_available(&self) -> bool {
        matches!(self, AdState::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(AdFormat::RewardedVideo.as_str(), "rewardedVideo");
        assert_eq!(AdFormat::AppOpen.to_string(), "appOpen");
        assert_eq!(
            serde_json::to_string(&AdFormat::AppOpen).unwrap(),
            "\"appOpen\""
        );
    }

    #[test]
    fn test_only_available_state_is_available() {
        assert!(AdState::Available.is_available());
        assert!(!AdState::Idle.is_available());
        assert!(!AdState::Loading.is_available());
        assert!(!AdState::Displaying.is_available());
    }

    #[test]
    fn test_ad_info_with_revenue() {
        let info = AdInfo::new(AdId(7), AdUnit::new("unit"), AdFormat::Native, "applovin")
            .with_revenue(0.0042, "USD");
        let revenue = info.revenue.unwrap();
        assert_eq!(revenue.currency, "USD");
        assert_eq!(info.id.to_string(), "ad-7");
    }
}
