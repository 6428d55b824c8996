//! Property-based tests for coordinator invariants
//!
//! These tests use proptest to verify:
//! - The retry counter equals the trailing run of load failures
//! - Availability mirrors the outcome of the last load
//! - A native coordinator destroys every ad it replaced

use mediation_core::testing::RecordingProvider;
use mediation_core::{AdError, AdEvent, AdFormat, Mediation, MediationConfig};
use proptest::prelude::*;
use std::sync::Arc;

const UNIT: &str = "prop-unit";

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

fn failure() -> AdEvent {
    AdEvent::LoadFailed {
        unit: UNIT.into(),
        error: AdError::new(-1, "no fill"),
    }
}

proptest! {
    #[test]
    fn test_retry_counter_tracks_trailing_failures(outcomes in prop::collection::vec(any::<bool>(), 1..40)) {
        let runtime = paused_runtime();
        let (attempt, available) = runtime.block_on(async {
            let provider = RecordingProvider::new();
            let mediation = Mediation::new(Arc::new(provider.clone()), MediationConfig::default()).unwrap();
            let service = mediation.interstitial(UNIT);

            for success in &outcomes {
                if *success {
                    provider.emit_loaded(AdFormat::Interstitial, UNIT);
                } else {
                    provider.emit(AdFormat::Interstitial, UNIT, failure());
                }
            }

            let snapshot = service.snapshot().await.unwrap();
            (snapshot.retry_attempt, snapshot.is_available())
        });

        let trailing = outcomes.iter().rev().take_while(|success| !**success).count();
        prop_assert_eq!(attempt as usize, trailing);
        prop_assert_eq!(available, *outcomes.last().unwrap());
    }

    #[test]
    fn test_native_destroys_every_replaced_ad(loads in 1usize..20) {
        let runtime = paused_runtime();
        let (loaded, destroyed, held) = runtime.block_on(async {
            let provider = RecordingProvider::new();
            let mediation = Mediation::new(Arc::new(provider.clone()), MediationConfig::default()).unwrap();
            let service = mediation.native(UNIT);

            let loaded: Vec<_> = (0..loads)
                .map(|_| provider.emit_loaded(AdFormat::Native, UNIT).id)
                .collect();
            let held = service.snapshot().await.unwrap().held_ad;
            (loaded, provider.destroyed(), held)
        });

        prop_assert_eq!(&destroyed[..], &loaded[..loads - 1]);
        prop_assert_eq!(held, loaded.last().copied());
    }
}
