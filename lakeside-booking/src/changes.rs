use chrono::{NaiveDate, Utc};
use lakeside_catalog::{AvailabilityFinder, PriceQuote, PricingResolver};
use lakeside_core::events::BookingEventSink;
use lakeside_core::{Booking, BookingRules, BookingWrite, HotelRepository, Occupancy, StoreError, ValidationRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::events;
use crate::manager::MAX_WRITE_ATTEMPTS;
use crate::reconciliation::write_promotion;
use crate::status::{next_status, BookingEvent};
use crate::validation::validate_stay;

/// Requested edit; absent fields keep the booking's current value.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BookingChange {
    #[serde(default)]
    pub check_in: Option<NaiveDate>,
    #[serde(default)]
    pub check_out: Option<NaiveDate>,
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomPriceChange {
    pub room_id: Uuid,
    pub room_number: String,
    pub original_rate: i64,
    pub new_rate: i64,
    pub nights: i64,
    pub original_total: i64,
    pub new_total: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceChangePreview {
    pub booking_id: Uuid,
    pub original_total: i64,
    pub new_total: i64,
    /// Positive when the guest owes more.
    pub difference: i64,
    pub currency: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub occupancy: Occupancy,
    pub per_room: Vec<RoomPriceChange>,
}

/// Re-prices date and occupancy edits. Preview and apply share `plan`.
pub struct PriceChangePlanner {
    repo: Arc<dyn HotelRepository>,
    events: Arc<dyn BookingEventSink>,
    finder: Arc<AvailabilityFinder>,
    pricing: Arc<PricingResolver>,
    rules: BookingRules,
}

impl PriceChangePlanner {
    pub fn new(
        repo: Arc<dyn HotelRepository>,
        events: Arc<dyn BookingEventSink>,
        finder: Arc<AvailabilityFinder>,
        pricing: Arc<PricingResolver>,
        rules: BookingRules,
    ) -> Self {
        Self { repo, events, finder, pricing, rules }
    }

    pub async fn preview_price_change(
        &self,
        booking_id: Uuid,
        change: &BookingChange,
    ) -> Result<PriceChangePreview, BookingError> {
        let booking = self.load(booking_id).await?;
        self.plan(&booking, change).await
    }

    pub async fn apply_price_change(
        &self,
        booking_id: Uuid,
        change: &BookingChange,
        accept_difference: bool,
    ) -> Result<Booking, BookingError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let booking = self.load(booking_id).await?;
            next_status(booking.status, BookingEvent::Amend)?;

            let check_in = change.check_in.unwrap_or(booking.check_in);
            let check_out = change.check_out.unwrap_or(booking.check_out);
            let occupancy = change.occupancy.unwrap_or(booking.occupancy);
            let dates_changed = check_in != booking.check_in || check_out != booking.check_out;
            if !dates_changed && occupancy == booking.occupancy {
                return Err(ValidationRule::NoChange.into());
            }

            if dates_changed {
                validate_stay(check_in, check_out, Utc::now().date_naive(), self.rules.max_stay_nights)?;
                self.ensure_rooms_free(&booking, check_in, check_out).await?;
            }

            let preview = self.plan(&booking, change).await?;
            if preview.difference != 0 && !accept_difference {
                return Err(BookingError::PriceChangeNotAccepted { difference: preview.difference });
            }
            if preview.new_total < booking.paid_amount {
                return Err(ValidationRule::TotalBelowPaid {
                    new_total: preview.new_total,
                    paid: booking.paid_amount,
                }
                .into());
            }

            let from = booking.status;
            let original_total = booking.total_amount;
            let amended = amend(booking, &preview)?;

            let write = BookingWrite { booking: amended, replace_rooms: true, payment: None };
            match write_promotion(self.repo.as_ref(), write, from, self.rules.hold_policy).await {
                Ok(updated) => {
                    tracing::info!(
                        booking_number = %updated.booking_number,
                        original_total,
                        new_total = updated.total_amount,
                        "Booking amended"
                    );
                    events::publish(self.events.as_ref(), events::booking_amended(&updated, original_total)).await;
                    if updated.status != from {
                        events::publish(self.events.as_ref(), events::status_changed(&updated, from)).await;
                    }
                    return Ok(updated);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(%booking_id, attempt, "Booking changed during amendment, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict { room_id: None })
    }

    /// Re-price every line of `booking` as if `change` were applied.
    pub async fn plan(&self, booking: &Booking, change: &BookingChange) -> Result<PriceChangePreview, BookingError> {
        let check_in = change.check_in.unwrap_or(booking.check_in);
        let check_out = change.check_out.unwrap_or(booking.check_out);
        let occupancy = change.occupancy.unwrap_or(booking.occupancy);

        let mut quotes: HashMap<Uuid, PriceQuote> = HashMap::new();
        let mut per_room = Vec::with_capacity(booking.rooms.len());
        for line in &booking.rooms {
            if !quotes.contains_key(&line.room_type_id) {
                let quote = self
                    .pricing
                    .quote(line.room_type_id, check_in, check_out, booking.guest.region, occupancy)
                    .await?;
                if quote.currency != booking.currency {
                    return Err(ValidationRule::MixedCurrencies.into());
                }
                quotes.insert(line.room_type_id, quote);
            }
            let quote = &quotes[&line.room_type_id];
            per_room.push(RoomPriceChange {
                room_id: line.room_id,
                room_number: line.room_number.clone(),
                original_rate: line.rate_per_night,
                new_rate: quote.price_per_night,
                nights: quote.nights,
                original_total: line.total_price,
                new_total: quote.total_price,
            });
        }

        let new_total: i64 = per_room.iter().map(|r| r.new_total).sum();
        Ok(PriceChangePreview {
            booking_id: booking.id,
            original_total: booking.total_amount,
            new_total,
            difference: new_total - booking.total_amount,
            currency: booking.currency.clone(),
            check_in,
            check_out,
            occupancy,
            per_room,
        })
    }

    /// The booking keeps its rooms, so only other stays can block the new dates.
    async fn ensure_rooms_free(&self, booking: &Booking, check_in: NaiveDate, check_out: NaiveDate) -> Result<(), BookingError> {
        match self.finder.first_held_room(&booking.room_ids(), check_in, check_out, booking.id).await? {
            Some(room_id) => Err(BookingError::RoomUnavailable { room_id }),
            None => Ok(()),
        }
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))
    }
}

/// Apply a plan to the booking it was computed from.
fn amend(mut booking: Booking, preview: &PriceChangePreview) -> Result<Booking, BookingError> {
    booking.check_in = preview.check_in;
    booking.check_out = preview.check_out;
    booking.occupancy = preview.occupancy;
    for line in booking.rooms.iter_mut() {
        if let Some(priced) = preview.per_room.iter().find(|r| r.room_id == line.room_id) {
            line.rate_per_night = priced.new_rate;
            line.nights = priced.nights;
            line.total_price = priced.new_total;
        }
    }
    booking.total_amount = preview.new_total;
    if booking.is_fully_paid() {
        booking.status = next_status(booking.status, BookingEvent::FullyPaid)?;
    }
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Requester;
    use crate::testing::{desk, Hotel};
    use lakeside_core::{BookingStatus, PaymentMethod, RoomStatus, SeasonalPricing};

    #[tokio::test]
    async fn test_preview_longer_stay() {
        let hotel = Hotel::new().await;
        let booking = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();

        let change = BookingChange { check_out: Some(booking.check_out + chrono::Duration::days(1)), ..Default::default() };
        let preview = hotel.planner.preview_price_change(booking.id, &change).await.unwrap();

        assert_eq!(preview.original_total, 14000);
        assert_eq!(preview.new_total, 21000);
        assert_eq!(preview.difference, 7000);
        assert_eq!(preview.per_room[0].nights, 3);
        assert_eq!(preview.per_room[0].original_rate, 7000);

        // Preview never writes.
        let stored = hotel.manager.get_booking(booking.id).await.unwrap();
        assert_eq!(stored.total_amount, 14000);
        assert_eq!(stored.version, booking.version);
    }

    #[tokio::test]
    async fn test_apply_requires_accepting_difference() {
        let hotel = Hotel::new().await;
        let booking = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();
        let change = BookingChange { occupancy: Some(Occupancy::Single), ..Default::default() };

        let err = hotel.planner.apply_price_change(booking.id, &change, false).await.unwrap_err();
        assert!(matches!(err, BookingError::PriceChangeNotAccepted { difference: -4000 }));

        let amended = hotel.planner.apply_price_change(booking.id, &change, true).await.unwrap();
        assert_eq!(amended.total_amount, 10000);
        assert_eq!(amended.rooms[0].rate_per_night, 5000);
        assert_eq!(amended.occupancy, Occupancy::Single);
        assert!(hotel.events.topics().await.contains(&"booking.amended"));
    }

    #[tokio::test]
    async fn test_shrinking_to_paid_amount_confirms() {
        let hotel = Hotel::new().await;
        let mut request = hotel.request(hotel.superior, 1, 10, 2);
        request.initial_payment = Some(10000);
        request.payment_method = Some(PaymentMethod::Cash);
        let booking = hotel.manager.create_booking(request, &desk()).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        let change = BookingChange { occupancy: Some(Occupancy::Single), ..Default::default() };
        let amended = hotel.planner.apply_price_change(booking.id, &change, true).await.unwrap();
        assert_eq!(amended.status, BookingStatus::Confirmed);
        assert!(hotel.events.topics().await.contains(&"booking.status_changed"));
    }

    #[tokio::test]
    async fn test_total_below_paid_rejected() {
        let hotel = Hotel::new().await;
        let mut request = hotel.request(hotel.superior, 1, 10, 2);
        request.initial_payment = Some(14000);
        let booking = hotel.manager.create_booking(request, &desk()).await.unwrap();

        let change = BookingChange { check_out: Some(booking.check_in + chrono::Duration::days(1)), ..Default::default() };
        let err = hotel.planner.apply_price_change(booking.id, &change, true).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::Validation(ValidationRule::TotalBelowPaid { new_total: 7000, paid: 14000 })
        ));
    }

    #[tokio::test]
    async fn test_new_dates_must_be_free_for_booked_rooms() {
        let hotel = Hotel::new().await;
        let booking = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 2, 10, 2), &Requester::Guest)
            .await
            .unwrap();
        hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 12, 2), &Requester::Guest)
            .await
            .unwrap();

        // Shifting within its own window is fine.
        let shift = BookingChange { check_in: Some(booking.check_in + chrono::Duration::days(1)), ..Default::default() };
        assert!(hotel.planner.apply_price_change(booking.id, &shift, true).await.is_ok());

        let extend = BookingChange { check_out: Some(booking.check_out + chrono::Duration::days(1)), ..Default::default() };
        let err = hotel.planner.apply_price_change(booking.id, &extend, true).await.unwrap_err();
        assert!(matches!(err, BookingError::RoomUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_room_in_housekeeping_does_not_block_own_date_edit() {
        let hotel = Hotel::new().await;
        let booking = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();
        let room_id = booking.rooms[0].room_id;
        hotel.manager.set_room_status(room_id, RoomStatus::Maintenance).await.unwrap();

        let extend = BookingChange { check_out: Some(booking.check_out + chrono::Duration::days(1)), ..Default::default() };
        let amended = hotel.planner.apply_price_change(booking.id, &extend, true).await.unwrap();
        assert_eq!(amended.rooms[0].room_id, room_id);
        assert_eq!(amended.nights(), 3);
    }

    #[tokio::test]
    async fn test_edit_does_not_reprice_other_bookings() {
        let hotel = Hotel::new().await;
        let first = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();
        let second = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();

        hotel
            .repo
            .add_seasonal_pricing(SeasonalPricing::with_multiplier(
                hotel.superior,
                "Peak",
                first.check_in,
                first.check_out,
                1.5,
            ))
            .await;
        let change = BookingChange { occupancy: Some(Occupancy::Single), ..Default::default() };
        let amended = hotel.planner.apply_price_change(first.id, &change, true).await.unwrap();
        assert_eq!(amended.rooms[0].rate_per_night, 7500);

        let untouched = hotel.manager.get_booking(second.id).await.unwrap();
        assert_eq!(untouched.rooms[0].rate_per_night, 7000);
        assert_eq!(untouched.total_amount, 14000);
    }

    #[tokio::test]
    async fn test_closed_booking_cannot_be_amended() {
        let hotel = Hotel::new().await;
        let booking = hotel
            .manager
            .create_booking(hotel.request(hotel.superior, 1, 10, 2), &Requester::Guest)
            .await
            .unwrap();
        hotel.manager.cancel_booking(booking.id).await.unwrap();

        let change = BookingChange { occupancy: Some(Occupancy::Single), ..Default::default() };
        let err = hotel.planner.apply_price_change(booking.id, &change, true).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition(_)));

        let err = hotel
            .planner
            .apply_price_change(Uuid::new_v4(), &BookingChange::default(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
    }
}
