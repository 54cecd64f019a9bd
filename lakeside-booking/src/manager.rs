use chrono::{NaiveDate, Utc};
use lakeside_catalog::{
    Allocation, AvailabilityFinder, CurrencySettings, PriceQuote, PricingResolver, RoomAllocator, RoomSelection,
};
use lakeside_core::events::BookingEventSink;
use lakeside_core::lock::RoomLock;
use lakeside_core::{
    Booking, BookingRoom, BookingRules, BookingWrite, GuestInfo, HotelRepository, NewBooking,
    Occupancy, Payment, PaymentMethod, PaymentStatus, RoomStatus, StoreError, ValidationRule,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::events;
use crate::number::BookingNumberGenerator;
use crate::status::{initial_status, next_status, BookingEvent};
use crate::validation::{validate_amount, validate_guest, validate_stay};

/// Attempts at a unique booking number before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 5;
/// Allocation+commit runs; the second one is the single retry after a race.
const MAX_CREATE_ATTEMPTS: usize = 2;
/// Version-checked writes re-read and retry this many times in total.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 3;

// ============================================================================
// Requests
// ============================================================================

/// Who is asking. Staff may confirm unpaid bookings and run desk operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    Guest,
    Staff { staff_id: String },
}

impl Requester {
    pub fn is_staff(&self) -> bool {
        matches!(self, Requester::Staff { .. })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateBookingRequest {
    pub guest: GuestInfo,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    pub occupancy: Occupancy,
    pub selection: RoomSelection,
    #[serde(default)]
    pub initial_payment: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    /// Honoured for staff only.
    #[serde(default)]
    pub staff_confirm: bool,
}

// ============================================================================
// Booking Manager
// ============================================================================

/// Manages booking lifecycle and state transitions
pub struct BookingManager {
    repo: Arc<dyn HotelRepository>,
    locks: Arc<dyn RoomLock>,
    events: Arc<dyn BookingEventSink>,
    finder: Arc<AvailabilityFinder>,
    allocator: RoomAllocator,
    pricing: Arc<PricingResolver>,
    numbers: BookingNumberGenerator,
    rules: BookingRules,
}

impl BookingManager {
    pub fn new(
        repo: Arc<dyn HotelRepository>,
        locks: Arc<dyn RoomLock>,
        events: Arc<dyn BookingEventSink>,
        rules: BookingRules,
    ) -> Self {
        let finder = Arc::new(AvailabilityFinder::new(repo.clone(), rules.hold_policy));
        let pricing = Arc::new(PricingResolver::new(repo.clone(), CurrencySettings::from(&rules)));
        Self {
            allocator: RoomAllocator::new(finder.clone()),
            numbers: BookingNumberGenerator::new(rules.number_prefix.clone()),
            repo,
            locks,
            events,
            finder,
            pricing,
            rules,
        }
    }

    pub fn finder(&self) -> Arc<AvailabilityFinder> {
        self.finder.clone()
    }

    pub fn pricing(&self) -> Arc<PricingResolver> {
        self.pricing.clone()
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        requester: &Requester,
    ) -> Result<Booking, BookingError> {
        // 1. Reject bad input before touching inventory
        validate_guest(&request.guest, request.adults)?;
        validate_stay(
            request.check_in,
            request.check_out,
            Utc::now().date_naive(),
            self.rules.max_stay_nights,
        )?;
        if let Some(amount) = request.initial_payment {
            validate_amount(amount)?;
            if amount > 0 && !requester.is_staff() {
                return Err(BookingError::StaffOnly("record an initial payment"));
            }
        }

        // 2. Allocate, lock and commit; one retry after a lost race
        let mut attempt = 1;
        let booking = loop {
            match self.allocate_and_commit(&request, requester).await {
                Err(e) if e.is_retryable() && attempt < MAX_CREATE_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "Lost a room race, re-allocating");
                    attempt += 1;
                }
                other => break other?,
            }
        };

        // 3. Announce
        tracing::info!(
            booking_number = %booking.booking_number,
            status = %booking.status,
            total = booking.total_amount,
            rooms = booking.rooms.len(),
            "Booking created"
        );
        events::publish(self.events.as_ref(), events::booking_created(&booking)).await;
        Ok(booking)
    }

    async fn allocate_and_commit(
        &self,
        request: &CreateBookingRequest,
        requester: &Requester,
    ) -> Result<Booking, BookingError> {
        let allocation = self
            .allocator
            .allocate(request.check_in, request.check_out, &request.selection)
            .await?;

        let owner = Uuid::new_v4().to_string();
        let held = self.acquire_locks(&allocation.sorted_room_ids(), &owner).await?;
        let outcome = self.price_and_commit(request, requester, &allocation).await;
        self.release_locks(&held, &owner).await;
        outcome
    }

    /// Lock rooms in id order. On contention, releases what it took.
    async fn acquire_locks(&self, room_ids: &[Uuid], owner: &str) -> Result<Vec<Uuid>, BookingError> {
        let ttl = self.rules.lock_ttl();
        let mut held = Vec::with_capacity(room_ids.len());
        for &room_id in room_ids {
            let acquired = match self.locks.try_acquire(room_id, owner, ttl).await {
                Ok(acquired) => acquired,
                Err(e) => {
                    self.release_locks(&held, owner).await;
                    return Err(e.into());
                }
            };
            if !acquired {
                tracing::debug!(%room_id, "Room lock held by another request");
                self.release_locks(&held, owner).await;
                return Err(BookingError::Conflict { room_id: Some(room_id) });
            }
            held.push(room_id);
        }
        Ok(held)
    }

    async fn release_locks(&self, room_ids: &[Uuid], owner: &str) {
        for &room_id in room_ids {
            if let Err(e) = self.locks.release(room_id, owner).await {
                tracing::warn!(%room_id, error = %e, "Failed to release room lock; it will expire");
            }
        }
    }

    async fn price_and_commit(
        &self,
        request: &CreateBookingRequest,
        requester: &Requester,
        allocation: &Allocation,
    ) -> Result<Booking, BookingError> {
        // 1. Freeze a rate on every allocated room
        let booking_id = Uuid::new_v4();
        let mut quotes: HashMap<Uuid, PriceQuote> = HashMap::new();
        let mut lines = Vec::with_capacity(allocation.rooms.len());

        for candidate in &allocation.rooms {
            let type_id = candidate.room.room_type_id;
            if !quotes.contains_key(&type_id) {
                let quote = self
                    .pricing
                    .quote(type_id, request.check_in, request.check_out, request.guest.region, request.occupancy)
                    .await?;
                quotes.insert(type_id, quote);
            }
            let quote = &quotes[&type_id];
            lines.push(BookingRoom {
                id: Uuid::new_v4(),
                booking_id,
                room_id: candidate.room.id,
                room_number: candidate.room.room_number.clone(),
                room_type_id: type_id,
                rate_per_night: quote.price_per_night,
                nights: quote.nights,
                total_price: quote.total_price,
            });
        }

        // 2. Totals, payment and initial status
        let currency = single_currency(quotes.values())?;
        let total_amount: i64 = lines.iter().map(|l| l.total_price).sum();
        let paid_amount = request.initial_payment.unwrap_or(0);
        if paid_amount > total_amount {
            return Err(BookingError::Overpayment { remaining: total_amount, attempted: paid_amount });
        }

        let now = Utc::now();
        let mut booking = Booking {
            id: booking_id,
            booking_number: String::new(),
            guest: request.guest.clone(),
            check_in: request.check_in,
            check_out: request.check_out,
            adults: request.adults,
            children: request.children,
            occupancy: request.occupancy,
            rooms: lines,
            total_amount,
            paid_amount,
            currency,
            status: initial_status(total_amount, paid_amount, requester.is_staff() && request.staff_confirm),
            payment_method: request.payment_method,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let initial_payment = (paid_amount > 0).then(|| {
            Payment::new(
                booking_id,
                paid_amount,
                request.payment_method.unwrap_or(PaymentMethod::Cash),
                PaymentStatus::Completed,
            )
            .with_reference(request.payment_reference.clone())
        });

        // 3. Insert under a fresh booking number until one is free
        let mut stored = None;
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            booking.booking_number = self.numbers.generate(now);
            let new_booking = NewBooking { booking: booking.clone(), initial_payment: initial_payment.clone() };
            match self.repo.insert_booking(new_booking, self.rules.hold_policy).await {
                Ok(saved) => {
                    stored = Some(saved);
                    break;
                }
                Err(StoreError::DuplicateBookingNumber(number)) => {
                    tracing::debug!(%number, "Booking number taken, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let booking = stored.ok_or_else(|| {
            BookingError::Infrastructure("could not generate a unique booking number".to_string())
        })?;

        // 4. Housekeeping view; failure here does not undo the booking
        if let Err(e) = self.repo.set_room_status(&booking.room_ids(), RoomStatus::Reserved).await {
            tracing::error!(booking_number = %booking.booking_number, error = %e, "Failed to mark rooms reserved");
        }
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))
    }

    /// Exact, case-sensitive lookup by the guest-facing number.
    pub async fn find_by_number(&self, booking_number: &str) -> Result<Booking, BookingError> {
        self.repo
            .find_booking_by_number(booking_number)
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_number))
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingEvent::Cancel, RoomStatus::Available).await
    }

    pub async fn check_in_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingEvent::CheckIn, RoomStatus::Occupied).await
    }

    pub async fn check_out_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingEvent::CheckOut, RoomStatus::Cleaning).await
    }

    pub async fn mark_no_show(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(booking_id, BookingEvent::NoShow, RoomStatus::Available).await
    }

    /// Housekeeping and maintenance flag; independent of bookings.
    pub async fn set_room_status(&self, room_id: Uuid, status: RoomStatus) -> Result<(), BookingError> {
        if self.repo.get_room(room_id).await?.is_none() {
            return Err(BookingError::NotFound { entity: "Room", id: room_id.to_string() });
        }
        self.repo.set_room_status(&[room_id], status).await?;
        tracing::info!(%room_id, %status, "Room status updated");
        Ok(())
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        event: BookingEvent,
        room_status: RoomStatus,
    ) -> Result<Booking, BookingError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut booking = self.get_booking(booking_id).await?;
            let from = booking.status;
            booking.status = next_status(from, event)?;

            let write = BookingWrite { booking, replace_rooms: false, payment: None };
            match self.repo.update_booking(write, self.rules.hold_policy).await {
                Ok(updated) => {
                    tracing::info!(
                        booking_number = %updated.booking_number,
                        %from,
                        to = %updated.status,
                        "Booking status changed"
                    );
                    if let Err(e) = self.repo.set_room_status(&updated.room_ids(), room_status).await {
                        tracing::error!(booking_number = %updated.booking_number, error = %e, "Failed to update room status");
                    }
                    let event = match event {
                        BookingEvent::Cancel => events::booking_cancelled(&updated, from),
                        _ => events::status_changed(&updated, from),
                    };
                    events::publish(self.events.as_ref(), event).await;
                    return Ok(updated);
                }
                Err(StoreError::VersionConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(%booking_id, attempt, "Booking changed underneath, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict { room_id: None })
    }
}

fn single_currency<'a>(quotes: impl Iterator<Item = &'a PriceQuote>) -> Result<String, BookingError> {
    let mut currency: Option<&str> = None;
    for quote in quotes {
        match currency {
            Some(c) if c != quote.currency => return Err(ValidationRule::MixedCurrencies.into()),
            _ => currency = Some(&quote.currency),
        }
    }
    currency
        .map(str::to_string)
        .ok_or_else(|| ValidationRule::EmptySelection.into())
}
