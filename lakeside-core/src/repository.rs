use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, HoldPolicy, RoomHold};
use crate::payment::{Payment, PaymentStatus};
use crate::room::{Room, RoomStatus, RoomType, SeasonalPricing};

/// Persistence failures, typed so the engine can tell races from outages.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("Room {room_id} is already held by an overlapping booking")]
    RoomConflict { room_id: Uuid },

    #[error("Booking {booking_id} was modified concurrently")]
    VersionConflict { booking_id: Uuid },

    #[error("Booking number already exists: {0}")]
    DuplicateBookingNumber(String),

    #[error("Payment reference already exists: {0}")]
    DuplicateReference(String),

    #[error("Payment {payment_id} is no longer in the expected state")]
    PaymentStateChanged { payment_id: Uuid },

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// A new booking and, when money was taken at the desk, its first payment.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking: Booking,
    pub initial_payment: Option<Payment>,
}

/// Payment row written in the same transaction as a booking update.
#[derive(Debug, Clone)]
pub enum PaymentWrite {
    Insert(Payment),
    /// Replace a payment row, provided it is still in `expected_status`.
    Transition {
        payment: Payment,
        expected_status: PaymentStatus,
    },
}

/// Version-checked replacement of a booking's mutable state.
///
/// `booking.version` must equal the stored version; the store bumps it.
#[derive(Debug, Clone)]
pub struct BookingWrite {
    pub booking: Booking,
    /// Line items were replaced (date or occupancy edit).
    pub replace_rooms: bool,
    pub payment: Option<PaymentWrite>,
}

/// Repository trait for everything the booking engine persists
#[async_trait]
pub trait HotelRepository: Send + Sync {
    async fn get_room_type(&self, id: Uuid) -> Result<Option<RoomType>, StoreError>;

    async fn list_room_types(&self) -> Result<Vec<RoomType>, StoreError>;

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Active rooms, optionally of one type.
    async fn list_rooms(&self, room_type_id: Option<Uuid>) -> Result<Vec<Room>, StoreError>;

    async fn set_room_status(&self, room_ids: &[Uuid], status: RoomStatus) -> Result<(), StoreError>;

    /// Seasonal entries of a type whose range touches `[from, to)`.
    async fn list_seasonal_pricing(
        &self,
        room_type_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SeasonalPricing>, StoreError>;

    /// Line items of bookings in `statuses` overlapping `[check_in, check_out)`.
    async fn list_room_holds(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<RoomHold>, StoreError>;

    /// Atomically insert a booking with its line items.
    ///
    /// Fails with `RoomConflict` when a line item overlaps one held under
    /// `policy`, and `DuplicateBookingNumber` on a number clash.
    async fn insert_booking(&self, new_booking: NewBooking, policy: HoldPolicy) -> Result<Booking, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Exact, case-sensitive lookup.
    async fn find_booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, StoreError>;

    async fn update_booking(&self, write: BookingWrite, policy: HoldPolicy) -> Result<Booking, StoreError>;

    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError>;

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn find_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, StoreError>;

    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, StoreError>;

    /// Conditional payment update that leaves the booking untouched.
    ///
    /// Returns `false` when the stored payment is no longer `expected_status`.
    async fn transition_payment(
        &self,
        payment: Payment,
        expected_status: PaymentStatus,
    ) -> Result<bool, StoreError>;
}
