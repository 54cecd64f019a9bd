use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use lakeside_booking::{
    BookingError, BookingManager, BookingNumberGenerator, CreateBookingRequest, PaymentReconciler, RecordPayment,
    Requester,
};
use lakeside_catalog::{RoomSelection, RoomTypeRequest};
use lakeside_core::memory::{InMemoryHotelRepository, InMemoryRoomLock, RecordingEventSink};
use lakeside_core::{
    Booking, BookingRules, BookingStatus, BookingWrite, GatewayOutcome, GuestInfo, GuestRegion, HoldPolicy,
    HotelRepository, NewBooking, Occupancy, Payment, PaymentMethod, PaymentStatus, PriceTable, Room, RoomHold,
    RoomStatus, RoomType, SeasonalPricing, StoreError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

fn superior_prices() -> PriceTable {
    PriceTable { single_domestic: 5000, double_domestic: 7000, single_international: 60, double_international: 85 }
}

async fn seed(repo: &InMemoryHotelRepository, rooms: usize) -> Uuid {
    let superior = repo.add_room_type(RoomType::new("Superior", superior_prices(), 2)).await;
    for i in 0..rooms {
        repo.add_room(Room::new(format!("2{:02}", i + 1), 2, superior)).await;
    }
    superior
}

fn request(room_type_id: Uuid, quantity: u32, offset_days: i64, nights: i64) -> CreateBookingRequest {
    let check_in = Utc::now().date_naive() + Duration::days(offset_days);
    CreateBookingRequest {
        guest: GuestInfo {
            full_name: "Otieno Odhiambo".to_string(),
            email: "otieno@example.com".to_string().into(),
            phone: "+254733000444".to_string().into(),
            region: GuestRegion::Domestic,
            nationality: None,
            special_requests: None,
        },
        check_in,
        check_out: check_in + Duration::days(nights),
        adults: 2,
        children: 0,
        occupancy: Occupancy::Double,
        selection: RoomSelection::ByType(vec![RoomTypeRequest { room_type_id, quantity }]),
        initial_payment: None,
        payment_method: None,
        payment_reference: None,
        staff_confirm: false,
    }
}

fn manager(repo: Arc<dyn HotelRepository>) -> BookingManager {
    BookingManager::new(
        repo,
        Arc::new(InMemoryRoomLock::new()),
        Arc::new(RecordingEventSink::new()),
        BookingRules::default(),
    )
}

fn confirmed_only() -> BookingRules {
    BookingRules { hold_policy: HoldPolicy::ConfirmedOnly, ..BookingRules::default() }
}

fn mobile_money(amount: i64, reference: &str) -> RecordPayment {
    RecordPayment {
        amount,
        method: PaymentMethod::MobileMoney,
        reference: Some(reference.to_string()),
        payer_phone: Some("+254733000444".to_string()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_double_book() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 2).await;
    let manager = Arc::new(manager(repo.clone()));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.create_booking(request(superior, 1, 20, 3), &Requester::Guest).await
        }));
    }

    let mut booked_rooms = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => booked_rooms.extend(booking.room_ids()),
            Err(e) => assert!(
                e.is_retryable() || matches!(e, BookingError::InsufficientAvailability { .. }),
                "unexpected error: {e}"
            ),
        }
    }

    assert!(!booked_rooms.is_empty());
    assert!(booked_rooms.len() <= 2);
    let distinct: HashSet<Uuid> = booked_rooms.iter().copied().collect();
    assert_eq!(distinct.len(), booked_rooms.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_for_different_rooms_both_succeed() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 2).await;
    let rooms = repo.list_rooms(Some(superior)).await.unwrap();
    let manager = Arc::new(manager(repo.clone()));

    let mut handles = Vec::new();
    for room in &rooms {
        let manager = manager.clone();
        let mut req = request(superior, 1, 5, 2);
        req.selection = RoomSelection::Explicit(vec![room.id]);
        handles.push(tokio::spawn(async move { manager.create_booking(req, &Requester::Guest).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn test_back_to_back_stays_share_a_room() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 1).await;
    let manager = manager(repo.clone());

    let early = manager.create_booking(request(superior, 1, 5, 2), &Requester::Guest).await.unwrap();
    let late = manager.create_booking(request(superior, 1, 7, 2), &Requester::Guest).await.unwrap();
    assert_eq!(early.rooms[0].room_id, late.rooms[0].room_id);
}

#[tokio::test]
async fn test_sequential_overlaps_rejected_after_stock_runs_out() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 2).await;
    let manager = manager(repo.clone());

    for _ in 0..2 {
        manager.create_booking(request(superior, 1, 3, 2), &Requester::Guest).await.unwrap();
    }
    let err = manager.create_booking(request(superior, 1, 4, 1), &Requester::Guest).await.unwrap_err();
    assert!(matches!(err, BookingError::InsufficientAvailability { available: 0, requested: 1, .. }));
}

#[tokio::test]
async fn test_frozen_prices_survive_seasonal_changes() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 3).await;
    let manager = manager(repo.clone());

    let before = manager.create_booking(request(superior, 1, 30, 2), &Requester::Guest).await.unwrap();
    assert_eq!(before.rooms[0].rate_per_night, 7000);

    let stay_start = before.check_in;
    let peak = repo
        .add_seasonal_pricing(SeasonalPricing::with_multiplier(superior, "Peak", stay_start, stay_start + Duration::days(5), 1.2))
        .await;
    repo.add_seasonal_pricing(SeasonalPricing::with_multiplier(superior, "Festival", stay_start, stay_start + Duration::days(1), 1.5))
        .await;

    let during = manager.create_booking(request(superior, 1, 30, 2), &Requester::Guest).await.unwrap();
    assert_eq!(during.rooms[0].rate_per_night, 10500);
    assert_eq!(during.total_amount, 21000);

    repo.remove_seasonal_pricing(peak).await;
    let reread = manager.get_booking(before.id).await.unwrap();
    assert_eq!(reread.rooms[0].rate_per_night, 7000);
    assert_eq!(reread.total_amount, 14000);
    let reread = manager.get_booking(during.id).await.unwrap();
    assert_eq!(reread.total_amount, 21000);
}

#[tokio::test]
async fn test_fixed_price_on_winning_entry() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 1).await;
    let manager = manager(repo.clone());
    let start = Utc::now().date_naive() + Duration::days(40);

    let mut regatta = SeasonalPricing::with_multiplier(superior, "Regatta", start, start + Duration::days(3), 1.5);
    regatta.fixed_price = Some(9000);
    repo.add_seasonal_pricing(regatta).await;
    repo.add_seasonal_pricing(SeasonalPricing::with_multiplier(superior, "Shoulder", start, start + Duration::days(3), 1.2))
        .await;

    let booking = manager.create_booking(request(superior, 1, 40, 2), &Requester::Guest).await.unwrap();
    assert_eq!(booking.rooms[0].rate_per_night, 9000);
    assert_eq!(booking.total_amount, 18000);
}

#[tokio::test]
async fn test_payment_scenario_and_idempotent_callback() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 1).await;
    let events = Arc::new(RecordingEventSink::new());
    let manager = BookingManager::new(repo.clone(), Arc::new(InMemoryRoomLock::new()), events.clone(), BookingRules::default());
    let reconciler = PaymentReconciler::new(repo.clone(), events.clone(), HoldPolicy::IncludePending);

    let booking = manager.create_booking(request(superior, 1, 2, 2), &Requester::Guest).await.unwrap();
    assert_eq!(booking.total_amount, 14000);
    assert_eq!(booking.status, BookingStatus::Pending);

    let push = mobile_money(14000, "ws_CO_191020261200");
    reconciler.record_payment(booking.id, push, &Requester::Guest).await.unwrap();

    let outcome = GatewayOutcome::Success { amount: Some(14000), receipt: Some("SJK2HD7Q1".to_string()) };
    for _ in 0..3 {
        assert!(reconciler.apply_gateway_callback("ws_CO_191020261200", outcome.clone()).await.accepted);
    }

    let settled = manager.get_booking(booking.id).await.unwrap();
    assert_eq!(settled.paid_amount, 14000);
    assert_eq!(settled.status, BookingStatus::Confirmed);
    let completed = events.topics().await.iter().filter(|t| **t == "payment.completed").count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_confirmed_only_lets_pending_stays_overlap_until_one_is_paid() {
    let repo = Arc::new(InMemoryHotelRepository::new());
    let superior = seed(&repo, 1).await;
    let events = Arc::new(RecordingEventSink::new());
    let rules = confirmed_only();
    let manager = BookingManager::new(repo.clone(), Arc::new(InMemoryRoomLock::new()), events.clone(), rules.clone());
    let reconciler = PaymentReconciler::new(repo.clone(), events.clone(), rules.hold_policy);

    let first = manager.create_booking(request(superior, 1, 6, 2), &Requester::Guest).await.unwrap();
    let second = manager.create_booking(request(superior, 1, 7, 2), &Requester::Guest).await.unwrap();
    assert_eq!(first.rooms[0].room_id, second.rooms[0].room_id);

    let finder = manager.finder();
    assert_eq!(finder.find_available_rooms(first.check_in, first.check_out, None).await.unwrap().len(), 1);

    reconciler.record_payment(first.id, mobile_money(14000, "ws_CO_A"), &Requester::Guest).await.unwrap();
    reconciler.record_payment(second.id, mobile_money(14000, "ws_CO_B"), &Requester::Guest).await.unwrap();
    let paid = GatewayOutcome::Success { amount: None, receipt: None };
    assert!(reconciler.apply_gateway_callback("ws_CO_A", paid.clone()).await.accepted);
    assert_eq!(manager.get_booking(first.id).await.unwrap().status, BookingStatus::Confirmed);
    assert!(finder.find_available_rooms(first.check_in, first.check_out, None).await.unwrap().is_empty());

    // The loser's money is still recorded; the booking waits for the desk.
    for _ in 0..2 {
        assert!(reconciler.apply_gateway_callback("ws_CO_B", paid.clone()).await.accepted);
    }
    let loser = manager.get_booking(second.id).await.unwrap();
    assert_eq!(loser.paid_amount, 14000);
    assert_eq!(loser.status, BookingStatus::Pending);
    let payments = reconciler.list_payments(second.id).await.unwrap();
    assert_eq!(payments[0].status, PaymentStatus::Completed);

    let err = manager.create_booking(request(superior, 1, 6, 1), &Requester::Guest).await.unwrap_err();
    assert!(matches!(err, BookingError::InsufficientAvailability { available: 0, requested: 1, .. }));
}

#[test]
fn test_ten_thousand_numbers_are_well_formed_and_mostly_unique() {
    let generator = BookingNumberGenerator::default();
    let now = Utc::now();
    let numbers: Vec<String> = (0..10_000).map(|_| generator.generate(now)).collect();

    let expected_prefix = format!("BK-{}-", now.format("%Y%m%d"));
    assert!(numbers.iter().all(|n| n.starts_with(&expected_prefix) && n.len() == expected_prefix.len() + 4));

    // 36^4 suffixes; a handful of collisions is expected and handled by the store.
    let distinct: HashSet<&String> = numbers.iter().collect();
    assert!(distinct.len() > 9_900);
}

/// Store that reports the first `clashes` booking numbers as taken.
struct ClashingNumbers {
    inner: InMemoryHotelRepository,
    clashes: AtomicUsize,
}

#[async_trait]
impl HotelRepository for ClashingNumbers {
    async fn get_room_type(&self, id: Uuid) -> Result<Option<RoomType>, StoreError> {
        self.inner.get_room_type(id).await
    }
    async fn list_room_types(&self) -> Result<Vec<RoomType>, StoreError> {
        self.inner.list_room_types().await
    }
    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        self.inner.get_room(id).await
    }
    async fn list_rooms(&self, room_type_id: Option<Uuid>) -> Result<Vec<Room>, StoreError> {
        self.inner.list_rooms(room_type_id).await
    }
    async fn set_room_status(&self, room_ids: &[Uuid], status: RoomStatus) -> Result<(), StoreError> {
        self.inner.set_room_status(room_ids, status).await
    }
    async fn list_seasonal_pricing(
        &self,
        room_type_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SeasonalPricing>, StoreError> {
        self.inner.list_seasonal_pricing(room_type_id, from, to).await
    }
    async fn list_room_holds(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<RoomHold>, StoreError> {
        self.inner.list_room_holds(check_in, check_out, statuses).await
    }
    async fn insert_booking(&self, new_booking: NewBooking, policy: HoldPolicy) -> Result<Booking, StoreError> {
        let remaining = self.clashes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.clashes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::DuplicateBookingNumber(new_booking.booking.booking_number));
        }
        self.inner.insert_booking(new_booking, policy).await
    }
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.inner.get_booking(id).await
    }
    async fn find_booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, StoreError> {
        self.inner.find_booking_by_number(booking_number).await
    }
    async fn update_booking(&self, write: BookingWrite, policy: HoldPolicy) -> Result<Booking, StoreError> {
        self.inner.update_booking(write, policy).await
    }
    async fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        self.inner.insert_payment(payment).await
    }
    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        self.inner.get_payment(id).await
    }
    async fn find_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, StoreError> {
        self.inner.find_payment_by_reference(reference).await
    }
    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        self.inner.list_payments(booking_id).await
    }
    async fn transition_payment(&self, payment: Payment, expected_status: PaymentStatus) -> Result<bool, StoreError> {
        self.inner.transition_payment(payment, expected_status).await
    }
}

#[tokio::test]
async fn test_number_clash_is_regenerated() {
    let inner = InMemoryHotelRepository::new();
    let superior = seed(&inner, 1).await;
    let repo = Arc::new(ClashingNumbers { inner, clashes: AtomicUsize::new(3) });
    let manager = manager(repo.clone());

    let booking = manager.create_booking(request(superior, 1, 2, 1), &Requester::Guest).await.unwrap();
    assert!(manager.find_by_number(&booking.booking_number).await.is_ok());
}

#[tokio::test]
async fn test_persistent_number_clash_gives_up() {
    let inner = InMemoryHotelRepository::new();
    let superior = seed(&inner, 1).await;
    let repo = Arc::new(ClashingNumbers { inner, clashes: AtomicUsize::new(usize::MAX) });
    let manager = manager(repo.clone());

    let err = manager.create_booking(request(superior, 1, 2, 1), &Requester::Guest).await.unwrap_err();
    assert!(matches!(err, BookingError::Infrastructure(_)));
}
