pub mod room;
pub mod booking;
pub mod payment;
pub mod repository;
pub mod lock;
pub mod events;
pub mod memory;
pub mod rules;

pub use booking::{Booking, BookingRoom, BookingStatus, GuestInfo, HoldPolicy, RoomHold};
pub use payment::{GatewayOutcome, Payment, PaymentMethod, PaymentStatus};
pub use repository::{BookingWrite, HotelRepository, NewBooking, PaymentWrite, StoreError};
pub use rules::BookingRules;
pub use room::{GuestRegion, Occupancy, PriceTable, Room, RoomStatus, RoomType, SeasonalPricing};

/// A violated input rule; each variant names exactly one check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationRule {
    #[error("check-in date {0} is in the past")]
    CheckInInPast(chrono::NaiveDate),
    #[error("check-out must be after check-in")]
    CheckOutNotAfterCheckIn,
    #[error("stay of {nights} nights exceeds the maximum of {max}")]
    StayTooLong { nights: i64, max: i64 },
    #[error("missing or invalid guest field: {0}")]
    MissingGuestField(&'static str),
    #[error("at least one adult is required")]
    InvalidGuestCount,
    #[error("no rooms requested")]
    EmptySelection,
    #[error("requested quantity for room type {0} must be positive")]
    ZeroQuantity(uuid::Uuid),
    #[error("room {0} requested more than once")]
    DuplicateRoom(uuid::Uuid),
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("new total {new_total} is below the {paid} already paid")]
    TotalBelowPaid { new_total: i64, paid: i64 },
    #[error("rooms in one booking must be priced in one currency")]
    MixedCurrencies,
    #[error("booking has no change to apply")]
    NoChange,
    #[error("payment reference {0} is already in use")]
    DuplicateReference(String),
    #[error("payment {0} is not in a refundable state")]
    NotRefundable(uuid::Uuid),
}
