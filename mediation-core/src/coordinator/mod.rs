//! Per-format ad coordinators
//!
//! Each coordinator is a single-writer actor: one Tokio task owns the SDK ad
//! object, the lifecycle state and the retry counter. Everything that can
//! touch that state arrives as a message on its mailbox.
//!
//! # Architecture
//!
//! ```text
//!  SDK thread(s)        AdService            retry timers
//!  AdEventSink::emit    CoordinatorHandle    (weak sender)
//!        │                    │                    │
//!        └──────── mpsc::unbounded_channel ────────┘
//!                             ▼
//! ┌──────────────────────────────────────────────────────┐
//! │             CoordinatorActor (single task)            │
//! │   CoordinatorCore: AdState, Backoff, generation       │
//! │   AdDriver: SDK ad object + delegate                  │
//! └─────────────────────────┬────────────────────────────┘
//!                           │ AvailabilityPublisher
//!                           ▼
//!                      bridge task
//! ```
//!
//! The SDK sink and the retry timers only hold weak senders, so once the
//! owning service lets go of its handle the actor tears down and any late
//! callback or timer fire is dropped.

pub mod banner;
pub mod fullscreen;
pub mod native;
pub mod rewarded;

use crate::bridge::{availability_channel, AvailabilityPublisher, AvailabilityStream};
use crate::delegate::AdEventDelegate;
use crate::error::AdError;
use crate::metrics::Metrics;
use crate::retry::{Backoff, RetryPolicy};
use crate::sdk::{AdEvent, AdEventSink};
use crate::types::{AdFormat, AdId, AdState, AdUnit};
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;
use uuid::Uuid;

/// Message sent to a coordinator actor
pub(crate) enum CoordinatorMessage {
    /// Request a load from the SDK
    Load,

    /// Show the loaded ad, if any
    Show,

    /// SDK callback
    Sdk(AdEvent),

    /// Retry timer elapsed
    RetryFired { generation: u64 },

    /// Read the current state
    Snapshot {
        response: oneshot::Sender<CoordinatorSnapshot>,
    },

    /// Tear down the coordinator
    Shutdown { response: oneshot::Sender<()> },
}

/// Point-in-time view of a coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorSnapshot {
    /// Coordinator instance id
    pub id: Uuid,

    /// Ad format
    pub format: AdFormat,

    /// Ad unit
    pub unit: AdUnit,

    /// Lifecycle state
    pub state: AdState,

    /// Consecutive load failures since the last success
    pub retry_attempt: u32,

    /// Whether a retry timer is armed
    pub retry_pending: bool,

    /// Native ad currently held
    pub held_ad: Option<AdId>,
}

impl CoordinatorSnapshot {
    /// Whether the coordinator considers its ad available
    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }
}

/// Runtime pieces every coordinator needs
#[derive(Clone)]
pub(crate) struct CoordinatorContext {
    pub(crate) runtime: Handle,
    pub(crate) policy: RetryPolicy,
    pub(crate) metrics: Arc<Metrics>,
}

/// Arms retry timers that post back into the coordinator mailbox
struct RetryScheduler {
    format: AdFormat,
    mailbox: mpsc::WeakUnboundedSender<CoordinatorMessage>,
    runtime: Handle,
    metrics: Arc<Metrics>,
}

impl RetryScheduler {
    fn schedule(&self, delay: Duration, generation: u64) {
        let format = self.format;
        let mailbox = self.mailbox.clone();
        let metrics = self.metrics.clone();

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let delivered = match mailbox.upgrade() {
                Some(mailbox) => mailbox
                    .send(CoordinatorMessage::RetryFired { generation })
                    .is_ok(),
                None => false,
            };

            if !delivered {
                tracing::debug!(%format, generation, "Retry timer fired after teardown");
                metrics.record_stale_callback(format);
            }
        });
    }
}

/// State and retry bookkeeping shared by every format
pub(crate) struct CoordinatorCore {
    id: Uuid,
    format: AdFormat,
    unit: AdUnit,
    state: AdState,
    backoff: Backoff,
    retry_generation: u64,
    retry_pending: bool,
    availability: AvailabilityPublisher,
    scheduler: RetryScheduler,
    metrics: Arc<Metrics>,
}

impl CoordinatorCore {
    pub(crate) fn is_available(&self) -> bool {
        self.state.is_available()
    }

    /// Availability write; published even when the value repeats
    fn set_state(&mut self, state: AdState) {
        self.state = state;
        tracing::debug!(state = ?state, "State transition");
        self.availability.publish(state.is_available());
    }

    /// A load is about to be requested
    pub(crate) fn begin_load(&mut self) {
        self.metrics.record_load_request(self.format);
        if matches!(self.state, AdState::Idle | AdState::Displaying) {
            self.state = AdState::Loading;
        }
    }

    /// SDK reported a successful load
    pub(crate) fn load_succeeded(&mut self) {
        self.backoff.reset();
        self.cancel_retry();
        self.set_state(AdState::Available);
    }

    /// SDK reported a failed load; returns the delay for the retry
    ///
    /// The retry is armed separately with [`CoordinatorCore::schedule_retry`]
    /// so the delegate hears about the failure first.
    pub(crate) fn load_failed(&mut self, error: &AdError) -> Duration {
        self.metrics.record_load_failure(self.format);
        self.set_state(AdState::Idle);
        let delay = self.backoff.record_failure();
        tracing::warn!(
            code = error.code,
            attempt = self.backoff.attempt(),
            delay_secs = delay.as_secs_f64(),
            "Ad failed to load"
        );
        delay
    }

    /// Arm a retry, superseding any retry still pending
    pub(crate) fn schedule_retry(&mut self, delay: Duration) {
        if self.retry_pending {
            tracing::debug!(generation = self.retry_generation, "Superseding pending retry");
        }
        self.retry_generation = self.retry_generation.wrapping_add(1);
        self.retry_pending = true;
        self.metrics
            .record_retry_scheduled(self.format, delay.as_secs_f64());
        self.scheduler.schedule(delay, self.retry_generation);
    }

    fn cancel_retry(&mut self) {
        if self.retry_pending {
            self.retry_generation = self.retry_generation.wrapping_add(1);
            self.retry_pending = false;
        }
    }

    /// Consume a timer fire; false if it was superseded or cancelled
    fn take_retry(&mut self, generation: u64) -> bool {
        if self.retry_pending && generation == self.retry_generation {
            self.retry_pending = false;
            true
        } else {
            false
        }
    }

    /// SDK reported the ad on screen
    pub(crate) fn displayed(&mut self) {
        self.set_state(AdState::Displaying);
    }

    /// SDK failed to present the ad; it is consumed either way
    pub(crate) fn display_failed(&mut self, error: &AdError) {
        tracing::warn!(code = error.code, "Ad failed to display");
        self.set_state(AdState::Idle);
    }

    /// Callback the format does not support
    pub(crate) fn ignore(&self, event: &AdEvent) {
        tracing::debug!(callback = event.kind(), "Ignoring callback not supported by format");
    }

    fn snapshot(&self, held_ad: Option<AdId>) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            id: self.id,
            format: self.format,
            unit: self.unit.clone(),
            state: self.state,
            retry_attempt: self.backoff.attempt(),
            retry_pending: self.retry_pending,
            held_ad,
        }
    }
}

/// Format-specific half of a coordinator
pub(crate) trait AdDriver: Send + 'static {
    /// Ask the SDK for an ad
    fn load(&mut self);

    /// Present the available ad
    fn show(&mut self);

    /// Apply one SDK callback
    fn handle_event(&mut self, core: &mut CoordinatorCore, event: AdEvent);

    /// Native ad currently held
    fn held_ad(&self) -> Option<AdId> {
        None
    }

    /// Release SDK resources before the actor exits
    fn teardown(&mut self) {}

    /// Record the request and forward it to the SDK
    fn request_load(&mut self, core: &mut CoordinatorCore) {
        core.begin_load();
        self.load();
    }
}

/// Transitions shared by interstitial, rewarded, app-open and banner
///
/// Returns the event back when it is not part of the shared surface.
pub(crate) fn handle_common_event<A, D>(
    driver: &mut A,
    core: &mut CoordinatorCore,
    delegate: &D,
    event: AdEvent,
) -> Option<AdEvent>
where
    A: AdDriver + ?Sized,
    D: AdEventDelegate + ?Sized,
{
    match event {
        AdEvent::Loaded(ad) => {
            core.load_succeeded();
            delegate.on_load(&ad);
        }
        AdEvent::LoadFailed { unit, error } => {
            let delay = core.load_failed(&error);
            delegate.on_fail_to_load(&unit, &error);
            core.schedule_retry(delay);
        }
        AdEvent::Displayed(ad) => {
            core.displayed();
            delegate.on_display(&ad);
        }
        AdEvent::Clicked(ad) => delegate.on_click(&ad),
        AdEvent::Hidden(ad) => {
            driver.request_load(core);
            delegate.on_hide(&ad);
        }
        AdEvent::DisplayFailed { ad, error } => {
            core.display_failed(&error);
            driver.request_load(core);
            delegate.on_fail_to_display(&ad, &error);
        }
        AdEvent::RevenuePaid(ad) => delegate.on_revenue_paid(&ad),
        other => return Some(other),
    }
    None
}

/// Actor that owns one coordinator
struct CoordinatorActor<A: AdDriver> {
    core: CoordinatorCore,
    driver: A,
    mailbox: mpsc::UnboundedReceiver<CoordinatorMessage>,
}

impl<A: AdDriver> CoordinatorActor<A> {
    /// Run the actor event loop
    async fn run(mut self) {
        let mut ack = None;

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                CoordinatorMessage::Load => self.driver.request_load(&mut self.core),

                CoordinatorMessage::Show => self.show(),

                CoordinatorMessage::Sdk(event) => {
                    tracing::debug!(callback = event.kind(), "SDK callback");
                    self.driver.handle_event(&mut self.core, event);
                }

                CoordinatorMessage::RetryFired { generation } => {
                    if self.core.take_retry(generation) {
                        tracing::debug!(generation, "Retrying load");
                        self.driver.request_load(&mut self.core);
                    } else {
                        tracing::debug!(generation, "Ignoring superseded retry");
                    }
                }

                CoordinatorMessage::Snapshot { response } => {
                    let _ = response.send(self.core.snapshot(self.driver.held_ad()));
                }

                CoordinatorMessage::Shutdown { response } => {
                    ack = Some(response);
                    break;
                }
            }
        }

        self.teardown();

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn show(&mut self) {
        if self.core.is_available() {
            self.core.metrics.record_show_request(self.core.format);
            self.driver.show();
        } else {
            tracing::debug!(state = ?self.core.state, "Show requested while unavailable");
        }
    }

    fn teardown(self) {
        let CoordinatorActor {
            core,
            mut driver,
            mut mailbox,
        } = self;

        mailbox.close();
        while let Ok(msg) = mailbox.try_recv() {
            if let CoordinatorMessage::Sdk(_) | CoordinatorMessage::RetryFired { .. } = msg {
                core.metrics.record_stale_callback(core.format);
            }
        }

        driver.teardown();
        tracing::debug!("Coordinator torn down");
        // Dropping the core drops the publisher, closing the availability stream
        drop(core);
    }
}

/// Handle owned by the service; dropping it tears the coordinator down
pub struct CoordinatorHandle {
    id: Uuid,
    format: AdFormat,
    sender: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl CoordinatorHandle {
    /// Coordinator instance id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ad format
    pub fn format(&self) -> AdFormat {
        self.format
    }

    /// Request a load
    pub fn load(&self) -> Result<()> {
        self.send(CoordinatorMessage::Load)
    }

    /// Show the ad if the coordinator has one available
    pub fn show(&self) -> Result<()> {
        self.send(CoordinatorMessage::Show)
    }

    /// Read the current state
    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorMessage::Snapshot { response: tx })?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Tear down and wait until SDK resources are released
    pub async fn shutdown(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorMessage::Shutdown { response: tx })?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    fn send(&self, msg: CoordinatorMessage) -> Result<()> {
        self.sender
            .send(msg)
            .map_err(|_| Error::Concurrency("Coordinator mailbox closed".to_string()))
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("id", &self.id)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Spawn a coordinator actor
///
/// `build` receives the callback sink and returns the driver wrapping the
/// SDK ad object created with it.
pub(crate) fn spawn_coordinator<A, F>(
    ctx: &CoordinatorContext,
    format: AdFormat,
    unit: &AdUnit,
    build: F,
) -> (CoordinatorHandle, AvailabilityStream)
where
    A: AdDriver,
    F: FnOnce(AdEventSink) -> A,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = AdEventSink::new(format, tx.downgrade(), ctx.metrics.clone());
    let driver = build(sink);
    let (publisher, stream) = availability_channel();

    let id = Uuid::new_v4();
    let core = CoordinatorCore {
        id,
        format,
        unit: unit.clone(),
        state: AdState::Idle,
        backoff: Backoff::new(ctx.policy),
        retry_generation: 0,
        retry_pending: false,
        availability: publisher,
        scheduler: RetryScheduler {
            format,
            mailbox: tx.downgrade(),
            runtime: ctx.runtime.clone(),
            metrics: ctx.metrics.clone(),
        },
        metrics: ctx.metrics.clone(),
    };

    let actor = CoordinatorActor {
        core,
        driver,
        mailbox: rx,
    };
    let span = tracing::info_span!("coordinator", %format, ad_unit = %unit, %id);
    ctx.runtime.spawn(actor.run().instrument(span));

    (
        CoordinatorHandle {
            id,
            format,
            sender: tx,
        },
        stream,
    )
}
