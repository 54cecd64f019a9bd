use lakeside_core::BookingStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that happened to a booking and may move its status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    FullyPaid,
    StaffConfirm,
    CheckIn,
    CheckOut,
    Cancel,
    NoShow,
    /// Date or occupancy edit; keeps the status.
    Amend,
}

impl BookingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEvent::FullyPaid => "FULLY_PAID",
            BookingEvent::StaffConfirm => "STAFF_CONFIRM",
            BookingEvent::CheckIn => "CHECK_IN",
            BookingEvent::CheckOut => "CHECK_OUT",
            BookingEvent::Cancel => "CANCEL",
            BookingEvent::NoShow => "NO_SHOW",
            BookingEvent::Amend => "AMEND",
        }
    }
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state transition: {event} is not allowed for a {from} booking")]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub event: BookingEvent,
}

/// The booking state machine. Every status change goes through here.
pub fn next_status(current: BookingStatus, event: BookingEvent) -> Result<BookingStatus, InvalidTransition> {
    use BookingStatus as S;

    match (current, event) {
        (S::Pending, BookingEvent::FullyPaid | BookingEvent::StaffConfirm) => Ok(S::Confirmed),
        (S::Confirmed | S::CheckedIn | S::CheckedOut, BookingEvent::FullyPaid) => Ok(current),
        (S::Confirmed, BookingEvent::CheckIn) => Ok(S::CheckedIn),
        (S::CheckedIn, BookingEvent::CheckOut) => Ok(S::CheckedOut),
        (S::Pending | S::Confirmed | S::CheckedIn, BookingEvent::Cancel) => Ok(S::Cancelled),
        (S::Pending | S::Confirmed, BookingEvent::NoShow) => Ok(S::NoShow),
        (S::Pending | S::Confirmed, BookingEvent::Amend) => Ok(current),
        _ => Err(InvalidTransition { from: current, event }),
    }
}

/// Status a new booking starts in.
pub fn initial_status(total_amount: i64, paid_amount: i64, staff_confirm: bool) -> BookingStatus {
    let start = BookingStatus::Pending;
    let event = if staff_confirm {
        BookingEvent::StaffConfirm
    } else if paid_amount >= total_amount {
        BookingEvent::FullyPaid
    } else {
        return start;
    };
    next_status(start, event).unwrap_or(start)
}

/// Whether a booking in `status` may still take money. Closed bookings
/// (checked out, cancelled, no-show) only settle through refunds.
pub fn accepts_payments(status: BookingStatus) -> bool {
    !status.is_terminal()
}
