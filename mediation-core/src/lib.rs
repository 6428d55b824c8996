//! Ad mediation core
//!
//! Lifecycle engine for mediated ads: one coordinator per ad format drives
//! the third-party SDK's load/show cycle, retries failed loads with capped
//! exponential backoff, and publishes availability to the caller-facing
//! service.
//!
//! # Architecture
//!
//! - **Single Writer**: each coordinator is one actor task; SDK callbacks,
//!   retry timers and caller requests all go through its mailbox
//! - **Bridge**: availability writes flow over an ordered channel into an
//!   observable property owned by the service
//! - **Weak callbacks**: the SDK sink and retry timers never keep a
//!   coordinator alive
//!
//! # Invariants
//!
//! - At most one coordinator per service, torn down with the service
//! - A successful load resets the retry counter to zero
//! - Every availability write reaches observers, in order
//! - A native coordinator holds at most one ad and destroys it on replace
//!   and on teardown
//!
//! # Features
//!
//! - `testing`: exports the [`testing`] module (recording provider and
//!   delegate) for downstream test suites

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod analytics;
pub mod bridge;
pub mod config;
mod coordinator;
pub mod debug;
pub mod delegate;
pub mod error;
pub mod mediation;
pub mod metrics;
pub mod retry;
pub mod sdk;
pub mod service;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-exports
pub use analytics::{AdAnalyticsEvent, AnalyticsSink, MemoryAnalyticsSink, TracingAnalyticsSink};
pub use config::{MediationConfig, RetryConfig};
pub use coordinator::{CoordinatorHandle, CoordinatorSnapshot};
pub use debug::{register_mediation_debugger, DebugEntry, DebugMenu, DebugSection};
pub use delegate::{
    AdEventDelegate, AnalyticsDelegate, BannerAdDelegate, NativeAdDelegate, RewardedAdDelegate,
};
pub use error::{AdError, Error, Result};
pub use mediation::Mediation;
pub use retry::RetryPolicy;
pub use sdk::{AdEvent, AdEventSink, AdProvider, BannerAd, FullscreenAd, NativeAdLoader};
pub use service::{
    AdService, AppOpenService, BannerService, FormatKind, InterstitialService, NativeService,
    RewardedService, ShowOutcome,
};
pub use types::{AdFormat, AdId, AdInfo, AdState, AdUnit, Revenue, Reward};
