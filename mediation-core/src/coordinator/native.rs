//! Native ad coordinator
//!
//! The coordinator holds at most one loaded native ad. A new load replaces
//! (and destroys) the previous one, and teardown destroys whatever is still
//! held, even if the actor is dropped mid-flight. Rendering does not consume
//! the ad, so availability survives a show.

use super::{AdDriver, CoordinatorCore};
use crate::delegate::NativeAdDelegate;
use crate::sdk::{AdEvent, NativeAdLoader};
use crate::types::{AdId, AdInfo};
use std::sync::Arc;

/// Native loader driver
pub(crate) struct NativeDriver {
    loader: Box<dyn NativeAdLoader>,
    delegate: Arc<dyn NativeAdDelegate>,
    loaded_ad: Option<AdInfo>,
}

impl NativeDriver {
    pub(crate) fn new(loader: Box<dyn NativeAdLoader>, delegate: Arc<dyn NativeAdDelegate>) -> Self {
        Self {
            loader,
            delegate,
            loaded_ad: None,
        }
    }

    fn release_held(&mut self) {
        if let Some(ad) = self.loaded_ad.take() {
            tracing::debug!(ad_id = %ad.id, "Destroying held native ad");
            self.loader.destroy(ad);
        }
    }

    fn hold(&mut self, ad: AdInfo) {
        if let Some(previous) = self.loaded_ad.take() {
            // Same ad re-delivered: nothing to release
            if previous.id != ad.id {
                tracing::debug!(ad_id = %previous.id, "Destroying replaced native ad");
                self.loader.destroy(previous);
            }
        }
        self.loaded_ad = Some(ad);
    }
}

impl AdDriver for NativeDriver {
    fn load(&mut self) {
        self.loader.load();
    }

    fn show(&mut self) {
        match &self.loaded_ad {
            Some(ad) => self.loader.render(ad),
            None => tracing::debug!("No native ad held to render"),
        }
    }

    fn handle_event(&mut self, core: &mut CoordinatorCore, event: AdEvent) {
        match event {
            AdEvent::Loaded(ad) => {
                self.hold(ad.clone());
                core.load_succeeded();
                self.delegate.on_load(&ad);
            }
            AdEvent::LoadFailed { unit, error } => {
                let delay = core.load_failed(&error);
                self.delegate.on_fail_to_load(&unit, &error);
                core.schedule_retry(delay);
            }
            AdEvent::Clicked(ad) => self.delegate.on_click(&ad),
            AdEvent::Expired(ad) => self.delegate.on_expire(&ad),
            AdEvent::RevenuePaid(ad) => self.delegate.on_revenue_paid(&ad),
            other => core.ignore(&other),
        }
    }

    fn held_ad(&self) -> Option<AdId> {
        self.loaded_ad.as_ref().map(|ad| ad.id)
    }

    fn teardown(&mut self) {
        self.release_held();
    }
}

// Covers an actor dropped without running teardown (runtime shutdown, panic)
impl Drop for NativeDriver {
    fn drop(&mut self) {
        self.release_held();
    }
}
