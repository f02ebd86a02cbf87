use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};
use crate::facility::FacilityId;
use crate::identity::UserId;
use crate::pricing::DurationDays;

/// Unique booking identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Requested by the farmer, awaiting payment or a decision.
    Pending,
    /// Payment confirmed, awaiting the operator's decision.
    Paid,
    Approved,
    Rejected,
    /// Storage period settled.
    Completed,
}

/// Something that happens to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingEvent {
    Pay,
    Approve,
    Reject,
    Complete,
}

impl BookingStatus {
    /// Status reached by applying `event`, or `None` if the event is not
    /// allowed from this status.
    pub fn next(self, event: BookingEvent) -> Option<BookingStatus> {
        use BookingEvent as E;
        use BookingStatus as S;
        match (self, event) {
            (S::Pending, E::Pay) => Some(S::Paid),
            (S::Pending | S::Paid, E::Approve) => Some(S::Approved),
            (S::Pending | S::Paid, E::Reject) => Some(S::Rejected),
            (S::Approved, E::Complete) => Some(S::Completed),
            _ => None,
        }
    }

    pub fn can_apply(self, event: BookingEvent) -> bool {
        self.next(event).is_some()
    }

    /// Still waiting on the operator (the "pending" tab).
    pub fn is_awaiting_decision(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Paid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingEvent::Pay => "pay",
            BookingEvent::Approve => "approve",
            BookingEvent::Reject => "reject",
            BookingEvent::Complete => "complete",
        })
    }
}

/// A farmer's reservation of facility capacity.
///
/// Bookings are never deleted, only transitioned. `end_date` is always
/// `start_date + duration_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub farmer: UserId,
    pub farmer_name: String,
    pub facility: FacilityId,
    pub facility_name: String,
    pub item_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub total_price: u64,
    pub duration_days: DurationDays,
    /// Bumped on every successful transition.
    pub version: u32,
}

impl Booking {
    /// Apply `event`. When `expected` is given it must match the current
    /// status, so a caller acting on a stale view is refused. On error the
    /// booking is left untouched.
    pub fn apply(
        &mut self,
        event: BookingEvent,
        expected: Option<BookingStatus>,
    ) -> Result<BookingStatus> {
        let invalid = MarketError::InvalidTransition {
            from: self.status,
            event,
        };
        if expected.is_some_and(|e| e != self.status) {
            return Err(invalid);
        }
        let next = self.status.next(event).ok_or(invalid)?;
        self.status = next;
        self.version += 1;
        Ok(next)
    }

    /// Storage length in days as given by the dates.
    pub fn stored_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Today's calendar date in UTC.
#[cfg(feature = "std")]
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Paid,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::Completed,
    ];
    const ALL_EVENTS: [BookingEvent; 4] = [
        BookingEvent::Pay,
        BookingEvent::Approve,
        BookingEvent::Reject,
        BookingEvent::Complete,
    ];

    fn booking(status: BookingStatus) -> Booking {
        let start = NaiveDate::from_ymd_opt(2024, 10, 12).unwrap();
        let duration = DurationDays::new(7).unwrap();
        Booking {
            id: BookingId("b1".into()),
            farmer: UserId("f1".into()),
            farmer_name: "Musa Ibrahim".into(),
            facility: FacilityId("r1".into()),
            facility_name: "Jos North Premium Storage".into(),
            item_name: "Cattle (4 Units)".into(),
            start_date: start,
            end_date: start + duration.as_chrono(),
            status,
            total_price: 35_000,
            duration_days: duration,
            version: 0,
        }
    }

    #[test]
    fn transition_table() {
        use BookingEvent as E;
        use BookingStatus as S;
        let allowed = [
            (S::Pending, E::Pay, S::Paid),
            (S::Pending, E::Approve, S::Approved),
            (S::Pending, E::Reject, S::Rejected),
            (S::Paid, E::Approve, S::Approved),
            (S::Paid, E::Reject, S::Rejected),
            (S::Approved, E::Complete, S::Completed),
        ];
        for from in ALL_STATUSES {
            for event in ALL_EVENTS {
                let expected = allowed
                    .iter()
                    .find(|(f, e, _)| *f == from && *e == event)
                    .map(|(_, _, to)| *to);
                assert_eq!(from.next(event), expected, "{from} + {event}");
            }
        }
    }

    #[test]
    fn pay_then_approve() {
        let mut b = booking(BookingStatus::Pending);
        assert_eq!(b.apply(BookingEvent::Pay, None).unwrap(), BookingStatus::Paid);
        assert_eq!(
            b.apply(BookingEvent::Approve, Some(BookingStatus::Paid)).unwrap(),
            BookingStatus::Approved
        );
        assert_eq!(b.version, 2);
    }

    #[test]
    fn invalid_transition_leaves_state_unchanged() {
        let mut b = booking(BookingStatus::Rejected);
        let before = b.clone();
        let err = b.apply(BookingEvent::Approve, None).unwrap_err();
        assert_eq!(
            err,
            MarketError::InvalidTransition {
                from: BookingStatus::Rejected,
                event: BookingEvent::Approve,
            }
        );
        assert_eq!(b, before);

        // A retry is refused the same way.
        assert!(b.apply(BookingEvent::Approve, None).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn stale_expected_status_is_refused() {
        let mut b = booking(BookingStatus::Paid);
        let before = b.clone();
        let err = b
            .apply(BookingEvent::Approve, Some(BookingStatus::Pending))
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition { .. }));
        assert_eq!(b, before);
    }

    #[test]
    fn dates_span_the_duration() {
        let b = booking(BookingStatus::Pending);
        assert_eq!(b.stored_days(), i64::from(b.duration_days.get()));
        assert_eq!(b.end_date, NaiveDate::from_ymd_opt(2024, 10, 19).unwrap());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
        let b = booking(BookingStatus::Pending);
        let back: Booking = serde_json::from_str(&serde_json::to_string(&b).unwrap()).unwrap();
        assert_eq!(back, b);
    }
}
