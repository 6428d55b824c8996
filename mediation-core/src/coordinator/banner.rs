//! Banner coordinator

use super::{handle_common_event, AdDriver, CoordinatorCore};
use crate::delegate::BannerAdDelegate;
use crate::sdk::{AdEvent, BannerAd};
use std::sync::Arc;

/// Banner view driver; expand and collapse are forwarded only
pub(crate) struct BannerDriver {
    view: Box<dyn BannerAd>,
    delegate: Arc<dyn BannerAdDelegate>,
}

impl BannerDriver {
    pub(crate) fn new(view: Box<dyn BannerAd>, delegate: Arc<dyn BannerAdDelegate>) -> Self {
        Self { view, delegate }
    }
}

impl AdDriver for BannerDriver {
    fn load(&mut self) {
        self.view.load();
    }

    fn show(&mut self) {
        self.view.show();
    }

    fn handle_event(&mut self, core: &mut CoordinatorCore, event: AdEvent) {
        let delegate = self.delegate.clone();
        match handle_common_event(self, core, delegate.as_ref(), event) {
            None => {}
            Some(AdEvent::Expanded(ad)) => delegate.on_expand(&ad),
            Some(AdEvent::Collapsed(ad)) => delegate.on_collapse(&ad),
            Some(other) => core.ignore(&other),
        }
    }
}
