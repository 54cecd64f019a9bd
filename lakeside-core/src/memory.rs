//! In-process implementations of the persistence seams.
//!
//! Used by tests and by the API when no database is configured. A single
//! mutex guards all state, so every trait method is one atomic step.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use lakeside_shared::models::IntegrationEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::booking::{stays_overlap, Booking, BookingStatus, HoldPolicy, RoomHold};
use crate::events::BookingEventSink;
use crate::lock::RoomLock;
use crate::payment::{Payment, PaymentStatus};
use crate::repository::{BookingWrite, HotelRepository, NewBooking, PaymentWrite, StoreError};
use crate::room::{Room, RoomStatus, RoomType, SeasonalPricing};

#[derive(Default)]
struct Inner {
    room_types: HashMap<Uuid, RoomType>,
    rooms: HashMap<Uuid, Room>,
    seasonal: Vec<SeasonalPricing>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
}

impl Inner {
    /// First room of `candidate` already held by another overlapping booking.
    fn conflicting_room(&self, candidate: &Booking, policy: HoldPolicy) -> Option<Uuid> {
        if !policy.holds_inventory(candidate.status) {
            return None;
        }

        for line in &candidate.rooms {
            let taken = self.bookings.values().any(|other| {
                other.id != candidate.id
                    && policy.holds_inventory(other.status)
                    && stays_overlap(other.check_in, other.check_out, candidate.check_in, candidate.check_out)
                    && other.rooms.iter().any(|r| r.room_id == line.room_id)
            });
            if taken {
                return Some(line.room_id);
            }
        }
        None
    }

    fn reference_taken(&self, payment: &Payment) -> bool {
        match &payment.reference {
            Some(reference) => self
                .payments
                .values()
                .any(|p| p.id != payment.id && p.reference.as_deref() == Some(reference.as_str())),
            None => false,
        }
    }
}

/// In-memory hotel repository
#[derive(Default)]
pub struct InMemoryHotelRepository {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryHotelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_room_type(&self, room_type: RoomType) -> Uuid {
        let id = room_type.id;
        self.inner.lock().await.room_types.insert(id, room_type);
        id
    }

    pub async fn add_room(&self, room: Room) -> Uuid {
        let id = room.id;
        self.inner.lock().await.rooms.insert(id, room);
        id
    }

    pub async fn add_seasonal_pricing(&self, entry: SeasonalPricing) -> Uuid {
        let id = entry.id;
        self.inner.lock().await.seasonal.push(entry);
        id
    }

    pub async fn remove_seasonal_pricing(&self, id: Uuid) {
        self.inner.lock().await.seasonal.retain(|s| s.id != id);
    }

    /// Simulate an unreachable backend: every call fails with `Backend`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn booking_count(&self) -> usize {
        self.inner.lock().await.bookings.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HotelRepository for InMemoryHotelRepository {
    async fn get_room_type(&self, id: Uuid) -> Result<Option<RoomType>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().await.room_types.get(&id).cloned())
    }

    async fn list_room_types(&self) -> Result<Vec<RoomType>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut types: Vec<RoomType> = inner.room_types.values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().await.rooms.get(&id).cloned())
    }

    async fn list_rooms(&self, room_type_id: Option<Uuid>) -> Result<Vec<Room>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut rooms: Vec<Room> = inner
            .rooms
            .values()
            .filter(|r| r.is_active)
            .filter(|r| room_type_id.map_or(true, |t| r.room_type_id == t))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.floor.cmp(&b.floor).then_with(|| a.room_number.cmp(&b.room_number)));
        Ok(rooms)
    }

    async fn set_room_status(&self, room_ids: &[Uuid], status: RoomStatus) -> Result<(), StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        for id in room_ids {
            if let Some(room) = inner.rooms.get_mut(id) {
                room.status = status;
            }
        }
        Ok(())
    }

    async fn list_seasonal_pricing(
        &self,
        room_type_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SeasonalPricing>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .seasonal
            .iter()
            .filter(|s| s.room_type_id == room_type_id && s.is_active && s.intersects(from, to))
            .cloned()
            .collect())
    }

    async fn list_room_holds(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<RoomHold>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let holds = inner
            .bookings
            .values()
            .filter(|b| statuses.contains(&b.status))
            .filter(|b| stays_overlap(b.check_in, b.check_out, check_in, check_out))
            .flat_map(|b| {
                b.rooms.iter().map(move |line| RoomHold {
                    room_id: line.room_id,
                    booking_id: b.id,
                    check_in: b.check_in,
                    check_out: b.check_out,
                    status: b.status,
                })
            })
            .collect();
        Ok(holds)
    }

    async fn insert_booking(&self, new_booking: NewBooking, policy: HoldPolicy) -> Result<Booking, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let NewBooking { booking, initial_payment } = new_booking;

        if inner.bookings.values().any(|b| b.booking_number == booking.booking_number) {
            return Err(StoreError::DuplicateBookingNumber(booking.booking_number));
        }
        if let Some(room_id) = inner.conflicting_room(&booking, policy) {
            return Err(StoreError::RoomConflict { room_id });
        }
        if let Some(payment) = &initial_payment {
            if inner.reference_taken(payment) {
                return Err(StoreError::DuplicateReference(payment.reference.clone().unwrap_or_default()));
            }
        }

        if let Some(payment) = initial_payment {
            inner.payments.insert(payment.id, payment);
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().await.bookings.get(&id).cloned())
    }

    async fn find_booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner.bookings.values().find(|b| b.booking_number == booking_number).cloned())
    }

    async fn update_booking(&self, write: BookingWrite, policy: HoldPolicy) -> Result<Booking, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let BookingWrite { mut booking, payment, .. } = write;

        let stored_version = inner
            .bookings
            .get(&booking.id)
            .map(|b| b.version)
            .ok_or(StoreError::BookingNotFound(booking.id))?;
        if stored_version != booking.version {
            return Err(StoreError::VersionConflict { booking_id: booking.id });
        }
        if let Some(room_id) = inner.conflicting_room(&booking, policy) {
            return Err(StoreError::RoomConflict { room_id });
        }

        match payment {
            Some(PaymentWrite::Insert(payment)) => {
                if inner.reference_taken(&payment) {
                    return Err(StoreError::DuplicateReference(payment.reference.unwrap_or_default()));
                }
                inner.payments.insert(payment.id, payment);
            }
            Some(PaymentWrite::Transition { payment, expected_status }) => {
                let current = inner.payments.get(&payment.id).map(|p| p.status);
                if current != Some(expected_status) {
                    return Err(StoreError::PaymentStateChanged { payment_id: payment.id });
                }
                inner.payments.insert(payment.id, payment);
            }
            None => {}
        }

        booking.version += 1;
        booking.updated_at = Utc::now();
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        if !inner.bookings.contains_key(&payment.booking_id) {
            return Err(StoreError::BookingNotFound(payment.booking_id));
        }
        if inner.reference_taken(&payment) {
            return Err(StoreError::DuplicateReference(payment.reference.clone().unwrap_or_default()));
        }
        inner.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        self.check_available()?;
        Ok(self.inner.lock().await.payments.get(&id).cloned())
    }

    async fn find_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .payments
            .values()
            .find(|p| p.reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        self.check_available()?;
        let inner = self.inner.lock().await;
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn transition_payment(
        &self,
        payment: Payment,
        expected_status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        match inner.payments.get(&payment.id) {
            Some(current) if current.status == expected_status => {
                inner.payments.insert(payment.id, payment);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-process room lock with expiry
#[derive(Default)]
pub struct InMemoryRoomLock {
    held: Mutex<HashMap<Uuid, (String, Instant)>>,
}

impl InMemoryRoomLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomLock for InMemoryRoomLock {
    async fn try_acquire(&self, room_id: Uuid, owner: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut held = self.held.lock().await;
        let now = Instant::now();

        if let Some((holder, expires_at)) = held.get(&room_id) {
            if *expires_at > now && holder != owner {
                return Ok(false);
            }
        }

        held.insert(room_id, (owner.to_string(), now + ttl));
        Ok(true)
    }

    async fn release(&self, room_id: Uuid, owner: &str) -> Result<(), StoreError> {
        let mut held = self.held.lock().await;
        if held.get(&room_id).map(|(holder, _)| holder == owner).unwrap_or(false) {
            held.remove(&room_id);
        }
        Ok(())
    }
}

/// Event sink that keeps everything it is given, for assertions.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<IntegrationEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<IntegrationEvent> {
        self.events.lock().await.clone()
    }

    pub async fn topics(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(|e| e.topic()).collect()
    }
}

#[async_trait]
impl BookingEventSink for RecordingEventSink {
    async fn publish(&self, event: &IntegrationEvent) -> Result<(), StoreError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
