use chrono::Utc;
use lakeside_core::events::BookingEventSink;
use lakeside_core::{Booking, BookingStatus, Payment};
use lakeside_shared::models::{
    BookingAmendedEvent, BookingCancelledEvent, BookingCreatedEvent, BookingStatusChangedEvent, GuestContact,
    IntegrationEvent, PaymentCompletedEvent, RoomRateLine,
};

/// Publish without failing the caller; the booking is already committed.
pub async fn publish(sink: &dyn BookingEventSink, event: IntegrationEvent) {
    if let Err(e) = sink.publish(&event).await {
        tracing::warn!(topic = event.topic(), key = %event.key(), error = %e, "Failed to publish integration event");
    }
}

pub fn booking_created(booking: &Booking) -> IntegrationEvent {
    IntegrationEvent::BookingCreated(BookingCreatedEvent {
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        guest: GuestContact {
            full_name: booking.guest.full_name.clone(),
            email: booking.guest.email.clone(),
            phone: booking.guest.phone.clone(),
        },
        check_in: booking.check_in,
        check_out: booking.check_out,
        rooms: booking
            .rooms
            .iter()
            .map(|line| RoomRateLine {
                room_id: line.room_id,
                room_number: line.room_number.clone(),
                rate_per_night: line.rate_per_night,
                nights: line.nights,
                total_price: line.total_price,
            })
            .collect(),
        total_amount: booking.total_amount,
        paid_amount: booking.paid_amount,
        currency: booking.currency.clone(),
        status: booking.status.to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

pub fn booking_cancelled(booking: &Booking, previous: BookingStatus) -> IntegrationEvent {
    IntegrationEvent::BookingCancelled(BookingCancelledEvent {
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        previous_status: previous.to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

pub fn booking_amended(booking: &Booking, original_total: i64) -> IntegrationEvent {
    IntegrationEvent::BookingAmended(BookingAmendedEvent {
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        check_in: booking.check_in,
        check_out: booking.check_out,
        original_total,
        new_total: booking.total_amount,
        status: booking.status.to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

pub fn status_changed(booking: &Booking, from: BookingStatus) -> IntegrationEvent {
    IntegrationEvent::BookingStatusChanged(BookingStatusChangedEvent {
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        from: from.to_string(),
        to: booking.status.to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

pub fn payment_completed(booking: &Booking, payment: &Payment) -> IntegrationEvent {
    IntegrationEvent::PaymentCompleted(PaymentCompletedEvent {
        payment_id: payment.id,
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        amount: payment.credited_amount,
        paid_amount: booking.paid_amount,
        total_amount: booking.total_amount,
        method: payment.method.to_string(),
        reference: payment.reference.clone(),
        booking_status: booking.status.to_string(),
        timestamp: Utc::now().timestamp(),
    })
}
