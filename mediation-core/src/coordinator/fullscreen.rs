//! Interstitial and app-open coordinators
//!
//! Both formats share the same surface: load, show, and reload once the ad
//! is dismissed or fails to present.

use super::{handle_common_event, AdDriver, CoordinatorCore};
use crate::delegate::AdEventDelegate;
use crate::sdk::{AdEvent, FullscreenAd};
use std::sync::Arc;

/// Driver for a full-screen ad without rewards
pub(crate) struct FullscreenDriver {
    ad: Box<dyn FullscreenAd>,
    delegate: Arc<dyn AdEventDelegate>,
}

impl FullscreenDriver {
    pub(crate) fn new(ad: Box<dyn FullscreenAd>, delegate: Arc<dyn AdEventDelegate>) -> Self {
        Self { ad, delegate }
    }
}

impl AdDriver for FullscreenDriver {
    fn load(&mut self) {
        self.ad.load();
    }

    fn show(&mut self) {
        self.ad.show();
    }

    fn handle_event(&mut self, core: &mut CoordinatorCore, event: AdEvent) {
        let delegate = self.delegate.clone();
        if let Some(other) = handle_common_event(self, core, delegate.as_ref(), event) {
            core.ignore(&other);
        }
    }
}
