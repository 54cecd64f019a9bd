use lakeside_catalog::{AllocationError, PricingError};
use lakeside_core::{StoreError, ValidationRule};
use uuid::Uuid;

use crate::status::InvalidTransition;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationRule),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Not enough rooms of type {room_type_id}: {available} available, {requested} requested")]
    InsufficientAvailability {
        room_type_id: Uuid,
        available: usize,
        requested: usize,
    },

    #[error("Room {room_id} is not available for the requested dates")]
    RoomUnavailable { room_id: Uuid },

    #[error("Payment of {attempted} exceeds the remaining balance of {remaining}")]
    Overpayment { remaining: i64, attempted: i64 },

    /// Lost a race with a concurrent request. Safe to retry.
    #[error("Concurrent modification, please retry")]
    Conflict { room_id: Option<Uuid> },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// The operation needs a staff requester.
    #[error("Only staff may {0}")]
    StaffOnly(&'static str),

    #[error("Price changes by {difference}; the difference must be accepted")]
    PriceChangeNotAccepted { difference: i64 },

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl BookingError {
    pub fn booking_not_found(id: impl ToString) -> Self {
        BookingError::NotFound { entity: "Booking", id: id.to_string() }
    }

    pub fn payment_not_found(id: Uuid) -> Self {
        BookingError::NotFound { entity: "Payment", id: id.to_string() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Conflict { .. })
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomConflict { room_id } => BookingError::Conflict { room_id: Some(room_id) },
            StoreError::VersionConflict { .. } | StoreError::PaymentStateChanged { .. } => {
                BookingError::Conflict { room_id: None }
            }
            StoreError::DuplicateReference(reference) => {
                BookingError::Validation(ValidationRule::DuplicateReference(reference))
            }
            StoreError::BookingNotFound(id) => BookingError::booking_not_found(id),
            StoreError::DuplicateBookingNumber(number) => {
                BookingError::Infrastructure(format!("booking number {} could not be made unique", number))
            }
            StoreError::Backend(message) => BookingError::Infrastructure(message),
        }
    }
}

impl From<AllocationError> for BookingError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InsufficientAvailability { room_type_id, available, requested } => {
                BookingError::InsufficientAvailability { room_type_id, available, requested }
            }
            AllocationError::RoomUnavailable { room_id } => BookingError::RoomUnavailable { room_id },
            AllocationError::Validation(rule) => BookingError::Validation(rule),
            AllocationError::Store(err) => err.into(),
        }
    }
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::RoomTypeNotFound(id) => BookingError::NotFound { entity: "Room type", id: id.to_string() },
            PricingError::InvalidStay { .. } => BookingError::Validation(ValidationRule::CheckOutNotAfterCheckIn),
            PricingError::Store(err) => err.into(),
        }
    }
}
