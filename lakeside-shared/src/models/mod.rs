pub mod events;

pub use events::{
    BookingAmendedEvent, BookingCancelledEvent, BookingCreatedEvent, BookingStatusChangedEvent,
    GuestContact, IntegrationEvent, PaymentCompletedEvent, RoomRateLine,
};
