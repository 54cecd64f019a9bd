pub mod error;
pub mod status;
pub mod number;
pub mod validation;
pub mod events;
pub mod manager;
pub mod changes;
pub mod reconciliation;

#[cfg(test)]
mod testing;

pub use changes::{BookingChange, PriceChangePlanner, PriceChangePreview, RoomPriceChange};
pub use error::BookingError;
pub use manager::{BookingManager, CreateBookingRequest, Requester};
pub use number::BookingNumberGenerator;
pub use reconciliation::{CallbackAck, PaymentReconciler, RecordPayment};
pub use status::{initial_status, next_status, BookingEvent, InvalidTransition};
