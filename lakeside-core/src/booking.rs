use chrono::{DateTime, NaiveDate, Utc};
use lakeside_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::payment::PaymentMethod;
use crate::room::{GuestRegion, Occupancy};

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::CheckedOut => "CHECKED_OUT",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::CheckedOut | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CHECKED_IN" => Ok(BookingStatus::CheckedIn),
            "CHECKED_OUT" => Ok(BookingStatus::CheckedOut),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "NO_SHOW" => Ok(BookingStatus::NoShow),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Which booking statuses keep their rooms out of availability.
///
/// `ConfirmedOnly` lets unpaid PENDING bookings overlap each other and a
/// later confirmed one; `IncludePending` makes a PENDING booking hold its
/// rooms until it is cancelled or marked no-show.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    ConfirmedOnly,
    #[default]
    IncludePending,
}

impl HoldPolicy {
    pub fn blocking_statuses(&self) -> &'static [BookingStatus] {
        match self {
            HoldPolicy::ConfirmedOnly => &[BookingStatus::Confirmed, BookingStatus::CheckedIn],
            HoldPolicy::IncludePending => &[
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                BookingStatus::CheckedIn,
            ],
        }
    }

    pub fn holds_inventory(&self, status: BookingStatus) -> bool {
        self.blocking_statuses().contains(&status)
    }
}

/// Half-open `[check_in, check_out)` overlap test.
pub fn stays_overlap(
    a_check_in: NaiveDate,
    a_check_out: NaiveDate,
    b_check_in: NaiveDate,
    b_check_out: NaiveDate,
) -> bool {
    a_check_in < b_check_out && a_check_out > b_check_in
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestInfo {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub region: GuestRegion,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

/// A booked room with the rate frozen at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRoom {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub room_id: Uuid,
    pub room_number: String,
    pub room_type_id: Uuid,
    pub rate_per_night: i64,
    pub nights: i64,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub guest: GuestInfo,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
    pub occupancy: Occupancy,
    pub rooms: Vec<BookingRoom>,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_method: Option<PaymentMethod>,
    /// Optimistic concurrency counter, bumped by every store write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn remaining_balance(&self) -> i64 {
        (self.total_amount - self.paid_amount).max(0)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.total_amount
    }

    /// Sum of line totals; equals `total_amount` for every persisted booking.
    pub fn line_total(&self) -> i64 {
        self.rooms.iter().map(|r| r.total_price).sum()
    }

    pub fn room_ids(&self) -> Vec<Uuid> {
        self.rooms.iter().map(|r| r.room_id).collect()
    }
}

/// One room's occupation by a booking, as seen by the availability search.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomHold {
    pub room_id: Uuid,
    pub booking_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    #[test]
    fn test_half_open_overlap() {
        // Back-to-back stays share a turnover day and do not overlap.
        assert!(!stays_overlap(date(1), date(3), date(3), date(5)));
        assert!(!stays_overlap(date(3), date(5), date(1), date(3)));
        assert!(stays_overlap(date(1), date(4), date(3), date(5)));
        assert!(stays_overlap(date(2), date(3), date(1), date(5)));
    }

    #[test]
    fn test_hold_policy_statuses() {
        assert!(!HoldPolicy::ConfirmedOnly.holds_inventory(BookingStatus::Pending));
        assert!(HoldPolicy::IncludePending.holds_inventory(BookingStatus::Pending));
        for policy in [HoldPolicy::ConfirmedOnly, HoldPolicy::IncludePending] {
            assert!(policy.holds_inventory(BookingStatus::CheckedIn));
            assert!(!policy.holds_inventory(BookingStatus::Cancelled));
            assert!(!policy.holds_inventory(BookingStatus::NoShow));
            assert!(!policy.holds_inventory(BookingStatus::CheckedOut));
        }
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::CheckedIn,
            BookingStatus::CheckedOut,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&BookingStatus::CheckedIn).unwrap(),
            "\"CHECKED_IN\""
        );
    }
}
