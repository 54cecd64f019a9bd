use chrono::NaiveDate;
use uuid::Uuid;

use crate::pii::Masked;

/// Contact details handed to notification collaborators.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct GuestContact {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct RoomRateLine {
    pub room_id: Uuid,
    pub room_number: String,
    pub rate_per_night: i64,
    pub nights: i64,
    pub total_price: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub guest: GuestContact,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomRateLine>,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub currency: String,
    pub status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub previous_status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingAmendedEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub original_total: i64,
    pub new_total: i64,
    pub status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentCompletedEvent {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub booking_number: String,
    pub amount: i64,
    pub paid_amount: i64,
    pub total_amount: i64,
    pub method: String,
    pub reference: Option<String>,
    pub booking_status: String,
    pub timestamp: i64,
}

/// Everything the engine announces to the outside world.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrationEvent {
    BookingCreated(BookingCreatedEvent),
    BookingCancelled(BookingCancelledEvent),
    BookingAmended(BookingAmendedEvent),
    BookingStatusChanged(BookingStatusChangedEvent),
    PaymentCompleted(PaymentCompletedEvent),
}

impl IntegrationEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            IntegrationEvent::BookingCreated(_) => "booking.created",
            IntegrationEvent::BookingCancelled(_) => "booking.cancelled",
            IntegrationEvent::BookingAmended(_) => "booking.amended",
            IntegrationEvent::BookingStatusChanged(_) => "booking.status_changed",
            IntegrationEvent::PaymentCompleted(_) => "payment.completed",
        }
    }

    /// Partition key; all events of one booking land on the same partition.
    pub fn key(&self) -> Uuid {
        match self {
            IntegrationEvent::BookingCreated(e) => e.booking_id,
            IntegrationEvent::BookingCancelled(e) => e.booking_id,
            IntegrationEvent::BookingAmended(e) => e.booking_id,
            IntegrationEvent::BookingStatusChanged(e) => e.booking_id,
            IntegrationEvent::PaymentCompleted(e) => e.booking_id,
        }
    }
}
