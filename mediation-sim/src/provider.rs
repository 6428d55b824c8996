//! Simulated ad network
//!
//! Ad objects answer on plain OS threads after a random latency, the way a
//! real SDK calls back from its own threads.

use mediation_core::{
    AdError, AdEvent, AdEventSink, AdFormat, AdId, AdInfo, AdProvider, AdUnit, BannerAd,
    FullscreenAd, NativeAdLoader, Reward,
};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Network name reported on simulated ads
const NETWORK: &str = "sim-network";

/// Knobs for the simulated network
#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    /// Probability a load fills
    pub fill_rate: f64,

    /// Upper bound of callback latency
    pub max_latency: Duration,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            fill_rate: 0.6,
            max_latency: Duration::from_millis(300),
        }
    }
}

/// Ad provider backed by the simulated network
#[derive(Debug, Clone)]
pub struct SimProvider {
    settings: SimSettings,
    next_id: Arc<Mutex<u64>>,
}

impl SimProvider {
    /// Create new provider
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    fn ad(&self, format: AdFormat, unit: &AdUnit, sink: AdEventSink) -> SimAd {
        SimAd {
            format,
            unit: unit.clone(),
            sink,
            settings: self.settings,
            next_id: self.next_id.clone(),
            current: None,
        }
    }
}

impl AdProvider for SimProvider {
    fn interstitial(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.ad(AdFormat::Interstitial, unit, sink))
    }

    fn rewarded(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.ad(AdFormat::RewardedVideo, unit, sink))
    }

    fn app_open(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn FullscreenAd> {
        Box::new(self.ad(AdFormat::AppOpen, unit, sink))
    }

    fn banner(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn BannerAd> {
        Box::new(self.ad(AdFormat::Banner, unit, sink))
    }

    fn native_loader(&self, unit: &AdUnit, sink: AdEventSink) -> Box<dyn NativeAdLoader> {
        Box::new(self.ad(AdFormat::Native, unit, sink))
    }

    fn show_mediation_debugger(&self) {
        tracing::info!(network = NETWORK, fill_rate = self.settings.fill_rate, "Mediation debugger opened");
    }
}

struct SimAd {
    format: AdFormat,
    unit: AdUnit,
    sink: AdEventSink,
    settings: SimSettings,
    next_id: Arc<Mutex<u64>>,
    current: Option<AdInfo>,
}

impl SimAd {
    fn latency(&self) -> Duration {
        let max = self.settings.max_latency.as_millis().max(1) as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..max))
    }

    /// Deliver callbacks from a separate thread after a random delay
    fn later(&self, events: Vec<AdEvent>) {
        let sink = self.sink.clone();
        let delay = self.latency();
        thread::spawn(move || {
            thread::sleep(delay);
            for event in events {
                sink.emit(event);
            }
        });
    }

    fn request(&mut self) {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.settings.fill_rate.clamp(0.0, 1.0)) {
            let id = {
                let mut next_id = self.next_id.lock();
                *next_id += 1;
                *next_id
            };
            let ad = AdInfo::new(AdId(id), self.unit.clone(), self.format, NETWORK);
            self.current = Some(ad.clone());
            self.later(vec![AdEvent::Loaded(ad)]);
        } else {
            self.later(vec![AdEvent::LoadFailed {
                unit: self.unit.clone(),
                error: AdError::new(204, "No fill"),
            }]);
        }
    }

    fn present(&mut self) {
        let Some(ad) = self.current.take() else {
            return;
        };

        let revenue = rand::thread_rng().gen_range(0.001..0.05);
        let paid = ad.clone().with_revenue(revenue, "USD");
        let mut events = vec![AdEvent::Displayed(ad.clone()), AdEvent::RevenuePaid(paid)];
        match self.format {
            AdFormat::RewardedVideo => events.push(AdEvent::RewardGranted {
                ad: ad.clone(),
                reward: Reward::new(10.0, "coins"),
            }),
            AdFormat::Banner => {
                events.push(AdEvent::Expanded(ad.clone()));
                events.push(AdEvent::Collapsed(ad.clone()));
            }
            _ => {}
        }
        if self.format != AdFormat::Banner {
            events.push(AdEvent::Hidden(ad));
        }
        self.later(events);
    }
}

impl FullscreenAd for SimAd {
    fn load(&mut self) {
        self.request();
    }

    fn show(&mut self) {
        self.present();
    }
}

impl BannerAd for SimAd {
    fn load(&mut self) {
        self.request();
    }

    fn show(&mut self) {
        self.present();
    }
}

impl NativeAdLoader for SimAd {
    fn load(&mut self) {
        self.request();
    }

    fn render(&mut self, ad: &AdInfo) {
        let revenue = rand::thread_rng().gen_range(0.001..0.02);
        self.later(vec![AdEvent::RevenuePaid(ad.clone().with_revenue(revenue, "USD"))]);
    }

    fn destroy(&mut self, ad: AdInfo) {
        tracing::debug!(ad_id = %ad.id, "Native ad destroyed");
    }
}
