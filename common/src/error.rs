use thiserror::Error;

use crate::booking::{BookingEvent, BookingStatus};

pub type Result<T> = std::result::Result<T, MarketError>;

/// Every failure the marketplace core can report. All of them are
/// recoverable: callers show the message and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// Input out of range or missing a required field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The booking's current status does not allow the event, or the
    /// caller's observed status is stale.
    #[error("cannot {event} a {from} booking")]
    InvalidTransition {
        from: BookingStatus,
        event: BookingEvent,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// No authenticated user.
    #[error("not signed in")]
    Unauthorized,

    /// Authenticated, but the role or ownership check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The session record could not be written or cleared.
    #[error("session storage failed: {0}")]
    Storage(String),
}

impl MarketError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MarketError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
