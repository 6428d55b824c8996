//! Rewarded ad coordinator

use super::{handle_common_event, AdDriver, CoordinatorCore};
use crate::delegate::RewardedAdDelegate;
use crate::sdk::{AdEvent, FullscreenAd};
use std::sync::Arc;

/// Full-screen driver that also forwards reward grants
pub(crate) struct RewardedDriver {
    ad: Box<dyn FullscreenAd>,
    delegate: Arc<dyn RewardedAdDelegate>,
}

impl RewardedDriver {
    pub(crate) fn new(ad: Box<dyn FullscreenAd>, delegate: Arc<dyn RewardedAdDelegate>) -> Self {
        Self { ad, delegate }
    }
}

impl AdDriver for RewardedDriver {
    fn load(&mut self) {
        self.ad.load();
    }

    fn show(&mut self) {
        self.ad.show();
    }

    fn handle_event(&mut self, core: &mut CoordinatorCore, event: AdEvent) {
        let delegate = self.delegate.clone();
        match handle_common_event(self, core, delegate.as_ref(), event) {
            None => {}
            // Reward grants never touch availability
            Some(AdEvent::RewardGranted { ad, reward }) => {
                tracing::info!(amount = reward.amount, label = %reward.label, "Reward granted");
                delegate.on_reward_granted(&ad, &reward);
            }
            Some(other) => core.ignore(&other),
        }
    }
}
