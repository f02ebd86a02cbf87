//! Simulated escrow payment.
//!
//! Each payment runs as its own task guarded by a cancellation token. When
//! the gateway answers, the task posts a [`PaymentEvent`]; a single applier
//! task turns confirmed events into `pay` transitions on the marketplace.
//! A payment stays in flight until the applier has recorded its outcome,
//! and a cancelled payment is never recorded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coldroom_common::booking::{Booking, BookingId, BookingStatus};
use coldroom_common::market::Marketplace;
use coldroom_common::{MarketError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum PaymentOutcome {
    Confirmed,
    Declined { reason: String },
}

/// Posted by a payment task when the gateway has answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub booking: BookingId,
    /// The attempt that produced this answer.
    pub attempt: u64,
    pub outcome: PaymentOutcome,
}

/// Where escrow payments are confirmed.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn confirm(&self, booking: &BookingId, amount: u64) -> PaymentOutcome;

    /// Human-readable gateway name.
    fn name(&self) -> &str;
}

/// Confirms every payment after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        SimulatedGateway { delay }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn confirm(&self, _booking: &BookingId, _amount: u64) -> PaymentOutcome {
        tokio::time::sleep(self.delay).await;
        PaymentOutcome::Confirmed
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// What the runner knows about a booking's payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentState {
    Idle,
    InFlight,
    Declined { reason: String },
}

struct InFlight {
    attempt: u64,
    token: CancellationToken,
}

/// Starts, tracks and cancels payment tasks.
#[derive(Clone)]
pub struct PaymentRunner {
    gateway: Arc<dyn PaymentGateway>,
    in_flight: Arc<DashMap<BookingId, InFlight>>,
    declined: Arc<DashMap<BookingId, String>>,
    attempts: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<PaymentEvent>,
}

impl PaymentRunner {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        events: mpsc::UnboundedSender<PaymentEvent>,
    ) -> Self {
        PaymentRunner {
            gateway,
            in_flight: Arc::new(DashMap::new()),
            declined: Arc::new(DashMap::new()),
            attempts: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Spawn a payment task for `booking`. Only one payment per booking may
    /// be in flight.
    pub fn start(&self, booking: BookingId, amount: u64) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        match self.in_flight.entry(booking.clone()) {
            Entry::Occupied(_) => {
                return Err(MarketError::Validation(format!(
                    "a payment for booking {booking} is already in progress"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(InFlight {
                    attempt,
                    token: token.clone(),
                });
            }
        }
        self.declined.remove(&booking);

        info!(%booking, amount, gateway = self.gateway.name(), "payment started");
        let runner = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%booking, "payment cancelled, completion discarded");
                }
                outcome = runner.gateway.confirm(&booking, amount) => {
                    if !runner.is_current(&booking, attempt) {
                        debug!(%booking, "payment finished after cancel, discarded");
                        return;
                    }
                    let event = PaymentEvent { booking: booking.clone(), attempt, outcome };
                    if runner.events.send(event).is_err() {
                        warn!("payment applier has stopped, event dropped");
                        runner.finish(&booking, attempt);
                    }
                }
            }
        });
        Ok(())
    }

    /// Cancel the in-flight payment for `booking`. Returns `false` if there
    /// was none.
    pub fn cancel(&self, booking: &BookingId) -> bool {
        match self.in_flight.remove(booking) {
            Some((_, f)) => {
                f.token.cancel();
                info!(%booking, "payment cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let ids: Vec<BookingId> = self.in_flight.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.cancel(&id);
        }
        self.declined.clear();
    }

    pub fn state(&self, booking: &BookingId) -> PaymentState {
        if self.in_flight.contains_key(booking) {
            return PaymentState::InFlight;
        }
        match self.declined.get(booking) {
            Some(reason) => PaymentState::Declined {
                reason: reason.clone(),
            },
            None => PaymentState::Idle,
        }
    }

    fn is_current(&self, booking: &BookingId, attempt: u64) -> bool {
        self.in_flight
            .get(booking)
            .is_some_and(|f| f.attempt == attempt)
    }

    /// Drop the in-flight entry if it still belongs to `attempt`.
    fn finish(&self, booking: &BookingId, attempt: u64) {
        self.in_flight.remove_if(booking, |_, f| f.attempt == attempt);
    }

    fn record_decline(&self, booking: BookingId, reason: String) {
        self.declined.insert(booking, reason);
    }
}

/// Turn one gateway answer into a booking transition.
pub fn apply_payment_event(market: &mut Marketplace, event: &PaymentEvent) -> Result<Booking> {
    match &event.outcome {
        PaymentOutcome::Confirmed => {
            market.confirm_payment(&event.booking, Some(BookingStatus::Pending))
        }
        PaymentOutcome::Declined { reason } => Err(MarketError::PaymentDeclined(reason.clone())),
    }
}

/// Apply payment events for as long as the node runs.
pub async fn run_payment_applier(
    market: Arc<Mutex<Marketplace>>,
    runner: PaymentRunner,
    mut events: mpsc::UnboundedReceiver<PaymentEvent>,
) {
    while let Some(event) = events.recv().await {
        let mut ledger = market.lock().await;
        if !runner.is_current(&event.booking, event.attempt) {
            debug!(booking = %event.booking, "payment cancelled before it was recorded");
            continue;
        }
        match apply_payment_event(&mut ledger, &event) {
            Ok(booking) => info!(booking = %booking.id, "payment confirmed"),
            Err(MarketError::PaymentDeclined(reason)) => {
                warn!(booking = %event.booking, "payment declined: {reason}");
                runner.record_decline(event.booking.clone(), reason);
            }
            Err(e) => warn!(booking = %event.booking, "payment result not applied: {e}"),
        }
        // Still holding the market lock, so a pending booking never looks
        // idle while its answer is unrecorded.
        runner.finish(&event.booking, event.attempt);
    }
    debug!("payment applier stopped");
}
