use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::booking::{Booking, BookingEvent, BookingId, BookingStatus};
use crate::catalog::Catalog;
use crate::error::{MarketError, Result};
use crate::facility::FacilityId;
use crate::identity::{random_id, BookingScope, User};
use crate::pricing::{compute_total, DurationDays};

/// Item name used when the farmer leaves the field blank.
pub const DEFAULT_ITEM_NAME: &str = "Mixed Stock";

/// Booking-table tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingTab {
    /// Pending or paid: still waiting on the operator.
    Pending,
    /// Approved and running.
    Active,
}

impl BookingTab {
    pub fn contains(self, status: BookingStatus) -> bool {
        match self {
            BookingTab::Pending => status.is_awaiting_decision(),
            BookingTab::Active => status == BookingStatus::Approved,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub tab: Option<BookingTab>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.is_none_or(|s| s == booking.status)
            && self.tab.is_none_or(|t| t.contains(booking.status))
    }
}

/// All catalog and booking data owned by one session.
#[derive(Debug, Clone, Default)]
pub struct Marketplace {
    pub catalog: Catalog,
    /// Oldest first.
    bookings: Vec<Booking>,
}

impl Marketplace {
    pub fn new(catalog: Catalog) -> Self {
        Marketplace {
            catalog,
            bookings: Vec::new(),
        }
    }

    pub fn booking(&self, id: &BookingId) -> Result<&Booking> {
        self.bookings
            .iter()
            .find(|b| b.id == *id)
            .ok_or_else(|| MarketError::not_found("booking", id.0.clone()))
    }

    fn booking_mut(&mut self, id: &BookingId) -> Result<&mut Booking> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == *id)
            .ok_or_else(|| MarketError::not_found("booking", id.0.clone()))
    }

    /// Reserve storage at `facility` for `duration_days`, starting `today`.
    /// The booking starts out `pending`.
    pub fn create_booking(
        &mut self,
        farmer: &User,
        facility: &FacilityId,
        item_name: &str,
        duration_days: u32,
        today: NaiveDate,
    ) -> Result<Booking> {
        self.create_booking_with(
            &mut rand::thread_rng(),
            farmer,
            facility,
            item_name,
            duration_days,
            today,
        )
    }

    pub fn create_booking_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        farmer: &User,
        facility: &FacilityId,
        item_name: &str,
        duration_days: u32,
        today: NaiveDate,
    ) -> Result<Booking> {
        if !farmer.role.can_book_storage() {
            return Err(MarketError::Forbidden(format!(
                "{} accounts cannot book storage",
                farmer.role
            )));
        }
        let facility = self
            .catalog
            .facility(facility)
            .ok_or_else(|| MarketError::not_found("facility", facility.0.clone()))?;
        let duration = DurationDays::new(duration_days)?;
        let total_price = compute_total(facility.base_price, duration)?;
        let item_name = match item_name.trim() {
            "" => DEFAULT_ITEM_NAME.to_string(),
            name => name.to_string(),
        };

        let id = loop {
            let candidate = BookingId(random_id(rng));
            if self.booking(&candidate).is_err() {
                break candidate;
            }
        };
        let booking = Booking {
            id,
            farmer: farmer.id.clone(),
            farmer_name: farmer.display_name(),
            facility: facility.id.clone(),
            facility_name: facility.name.clone(),
            item_name,
            start_date: today,
            end_date: today + duration.as_chrono(),
            status: BookingStatus::Pending,
            total_price,
            duration_days: duration,
            version: 0,
        };
        self.bookings.push(booking.clone());
        Ok(booking)
    }

    /// Insert an already-formed booking, e.g. demo data.
    pub(crate) fn insert_booking(&mut self, booking: Booking) {
        self.bookings.push(booking);
    }

    fn is_visible_to(&self, actor: &User, booking: &Booking) -> bool {
        match actor.role.booking_scope() {
            BookingScope::Own => booking.farmer == actor.id,
            BookingScope::OperatedFacilities => self
                .catalog
                .facility(&booking.facility)
                .is_some_and(|f| f.is_operated_by(&actor.id)),
            BookingScope::All => true,
            BookingScope::None => false,
        }
    }

    /// Bookings visible to `actor`, newest first.
    pub fn list_bookings(&self, actor: &User, filter: &BookingFilter) -> Vec<&Booking> {
        self.bookings
            .iter()
            .rev()
            .filter(|b| self.is_visible_to(actor, b))
            .filter(|b| filter.matches(b))
            .collect()
    }

    /// Booking `id`, if `actor` is allowed to see it.
    pub fn visible_booking(&self, actor: &User, id: &BookingId) -> Result<&Booking> {
        let booking = self.booking(id)?;
        if !self.is_visible_to(actor, booking) {
            return Err(MarketError::Forbidden(format!(
                "booking {id} is not visible to this account"
            )));
        }
        Ok(booking)
    }

    /// Check that `actor` may start paying for booking `id`.
    pub fn ensure_payer(&self, actor: &User, id: &BookingId) -> Result<&Booking> {
        let booking = self.booking(id)?;
        if booking.farmer != actor.id {
            return Err(MarketError::Forbidden(format!(
                "booking {id} belongs to another farmer"
            )));
        }
        if !booking.status.can_apply(BookingEvent::Pay) {
            return Err(MarketError::InvalidTransition {
                from: booking.status,
                event: BookingEvent::Pay,
            });
        }
        Ok(booking)
    }

    /// Record a confirmed payment.
    pub fn confirm_payment(
        &mut self,
        id: &BookingId,
        expected: Option<BookingStatus>,
    ) -> Result<Booking> {
        let booking = self.booking_mut(id)?;
        booking.apply(BookingEvent::Pay, expected)?;
        Ok(booking.clone())
    }

    pub fn approve(
        &mut self,
        actor: &User,
        id: &BookingId,
        expected: Option<BookingStatus>,
    ) -> Result<Booking> {
        self.decide(actor, id, BookingEvent::Approve, expected)
    }

    pub fn reject(
        &mut self,
        actor: &User,
        id: &BookingId,
        expected: Option<BookingStatus>,
    ) -> Result<Booking> {
        self.decide(actor, id, BookingEvent::Reject, expected)
    }

    fn decide(
        &mut self,
        actor: &User,
        id: &BookingId,
        event: BookingEvent,
        expected: Option<BookingStatus>,
    ) -> Result<Booking> {
        let facility_id = self.booking(id)?.facility.clone();
        let operates = actor.role.can_manage_bookings()
            && self
                .catalog
                .facility(&facility_id)
                .is_some_and(|f| f.is_operated_by(&actor.id));
        if !operates {
            return Err(MarketError::Forbidden(format!(
                "only the operator of facility {facility_id} may {event} booking {id}"
            )));
        }
        let booking = self.booking_mut(id)?;
        booking.apply(event, expected)?;
        Ok(booking.clone())
    }

    /// Mark every approved booking whose storage period has ended by `today`
    /// as completed. Returns `true` if any booking changed.
    pub fn settle_completed(&mut self, today: NaiveDate) -> bool {
        let mut changed = false;
        for booking in &mut self.bookings {
            if booking.status == BookingStatus::Approved
                && booking.end_date <= today
                && booking.apply(BookingEvent::Complete, None).is_ok()
            {
                changed = true;
            }
        }
        changed
    }
}
